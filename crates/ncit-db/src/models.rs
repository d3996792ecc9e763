//! Row and input types that only the storage layer deals in.
//! Read paths hand back ncit-types models directly.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use ncit_types::models::{BlogStatus, EventStatus, NotificationKind, Profile};

/// A user together with the stored password hash. Never serialized.
pub struct UserRow {
    pub profile: Profile,
    pub password: String,
}

/// Full set of author-editable blog columns, written on insert and update.
#[derive(Debug, Clone)]
pub struct BlogInput {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub category_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub status: BlogStatus,
}

#[derive(Debug, Clone, Default)]
pub struct BlogFilter {
    pub category: Option<Uuid>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub author: Option<Uuid>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub category_id: Option<Uuid>,
    pub event_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: String,
    pub max_participants: Option<i64>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub category: Option<Uuid>,
    /// Only events starting at or after this instant.
    pub starts_after: Option<DateTime<Utc>>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}
