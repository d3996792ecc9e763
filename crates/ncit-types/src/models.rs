use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a status/role/kind column holds a value we don't know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Enums persisted as text columns. Generates `as_str`, `Display` and `FromStr`
/// from a single variant <-> string table so the two never drift apart.
macro_rules! text_enum {
    ($name:ident, $label:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $label,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

// -- Users --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Faculty,
    Admin,
}

text_enum!(UserRole, "role", {
    Student => "student",
    Faculty => "faculty",
    Admin => "admin",
});

impl UserRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile as shown to other users: no email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub full_name: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub department: Option<String>,
}

impl From<Profile> for PublicProfile {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            full_name: p.full_name,
            role: p.role,
            avatar_url: p.avatar_url,
            bio: p.bio,
            department: p.department,
        }
    }
}

// -- Categories --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Blog,
    Event,
}

text_enum!(CategoryKind, "category kind", {
    Blog => "blog",
    Event => "event",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    pub description: Option<String>,
}

// -- Blogs --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlogStatus {
    Draft,
    Pending,
    Published,
    Archived,
}

text_enum!(BlogStatus, "blog status", {
    Draft => "draft",
    Pending => "pending",
    Published => "published",
    Archived => "archived",
});

impl BlogStatus {
    /// Whether the author (not an admin) may move a blog from `self` to `to`.
    /// Authors shuffle between draft and pending and may resubmit an archived
    /// blog; publishing and archiving are moderation actions.
    pub fn author_may_move_to(&self, to: BlogStatus) -> bool {
        use BlogStatus::*;
        match (self, to) {
            (from, to) if *from == to => true,
            (Draft, Pending) | (Pending, Draft) => true,
            (Archived, Pending) | (Archived, Draft) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub status: BlogStatus,
    pub views: i64,
    pub likes: i64,
    pub reading_time: u32,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

// -- Events --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

text_enum!(EventStatus, "event status", {
    Upcoming => "upcoming",
    Ongoing => "ongoing",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl EventStatus {
    pub fn accepts_registrations(&self) -> bool {
        matches!(self, EventStatus::Upcoming | EventStatus::Ongoing)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// `None` once the organizer's account is deleted.
    pub organizer_id: Option<Uuid>,
    pub organizer_name: String,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub event_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: String,
    pub max_participants: Option<i64>,
    pub current_participants: i64,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_full(&self) -> bool {
        self.max_participants
            .is_some_and(|max| self.current_participants >= max)
    }

    pub fn registration_closed(&self, now: DateTime<Utc>) -> bool {
        self.registration_deadline.is_some_and(|deadline| now > deadline)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRegistration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub registered_at: DateTime<Utc>,
}

/// Registration row joined with the registrant, for organizers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registrant {
    pub registration_id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub registered_at: DateTime<Utc>,
}

// -- Comments --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub blog_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub likes: i64,
    pub is_edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<Comment>,
}

// -- Notifications --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BlogApproved,
    BlogRejected,
    BlogSubmitted,
    EventRegistration,
    EventCancelled,
    Comment,
    CommentReply,
    Announcement,
}

text_enum!(NotificationKind, "notification kind", {
    BlogApproved => "blog_approved",
    BlogRejected => "blog_rejected",
    BlogSubmitted => "blog_submitted",
    EventRegistration => "event_registration",
    EventCancelled => "event_cancelled",
    Comment => "comment",
    CommentReply => "comment_reply",
    Announcement => "announcement",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_text_round_trips_through_columns() {
        for status in BlogStatus::ALL {
            assert_eq!(status.as_str().parse::<BlogStatus>().unwrap(), *status);
        }
        let err = "deleted".parse::<BlogStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown blog status 'deleted'");
    }

    #[test]
    fn serde_matches_column_text() {
        let json = serde_json::to_string(&NotificationKind::CommentReply).unwrap();
        assert_eq!(json, "\"comment_reply\"");
        assert_eq!(NotificationKind::CommentReply.as_str(), "comment_reply");
    }

    #[test]
    fn authors_cannot_publish_or_archive() {
        use BlogStatus::*;
        assert!(Draft.author_may_move_to(Pending));
        assert!(Pending.author_may_move_to(Draft));
        assert!(Archived.author_may_move_to(Pending));
        assert!(Published.author_may_move_to(Published));

        assert!(!Draft.author_may_move_to(Published));
        assert!(!Pending.author_may_move_to(Published));
        assert!(!Pending.author_may_move_to(Archived));
        assert!(!Published.author_may_move_to(Draft));
    }

    #[test]
    fn event_capacity_and_deadline() {
        let now = Utc::now();
        let mut event = Event {
            id: Uuid::new_v4(),
            title: "Hackathon".into(),
            description: String::new(),
            organizer_id: Some(Uuid::new_v4()),
            organizer_name: "Admin".into(),
            category_id: None,
            category_name: None,
            event_date: now + Duration::days(7),
            end_date: None,
            location: "Main hall".into(),
            max_participants: Some(2),
            current_participants: 1,
            registration_deadline: Some(now + Duration::days(1)),
            image_url: None,
            status: EventStatus::Upcoming,
            created_at: now,
            updated_at: now,
        };

        assert!(!event.is_full());
        assert!(!event.registration_closed(now));

        event.current_participants = 2;
        assert!(event.is_full());
        assert!(event.registration_closed(now + Duration::days(2)));

        event.max_participants = None;
        assert!(!event.is_full());
    }
}
