use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{BlogStatus, CategoryKind, EventStatus, Profile, UserRole};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub profile: Profile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub department: Option<String>,
}

// -- Blogs --

#[derive(Debug, Default, Deserialize)]
pub struct BlogListQuery {
    pub category: Option<Uuid>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub author: Option<Uuid>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBlogRequest {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: Option<BlogStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    /// `null` clears the category; a missing field leaves it alone.
    #[serde(default, deserialize_with = "clearable")]
    pub category_id: Option<Option<Uuid>>,
    pub tags: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub status: Option<BlogStatus>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<BlogStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectBlogRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetBlogStatusRequest {
    pub status: BlogStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes: i64,
}

// -- Events --

#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    pub status: Option<EventStatus>,
    pub category: Option<Uuid>,
    #[serde(default)]
    pub upcoming: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventRequest {
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

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
/// Optional fields take `null` to clear them; missing fields are unchanged.
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "clearable")]
    pub category_id: Option<Option<Uuid>>,
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "clearable")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "clearable")]
    pub max_participants: Option<Option<i64>>,
    #[serde(default, deserialize_with = "clearable")]
    pub registration_deadline: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "clearable")]
    pub image_url: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetEventStatusRequest {
    pub status: EventStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationStatus {
    pub registered: bool,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    pub content: String,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_notification_limit")]
    pub limit: u32,
}

fn default_notification_limit() -> u32 {
    50
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnouncementRequest {
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

// -- Admin --

#[derive(Debug, Default, Deserialize)]
pub struct UserSearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BlogCounts {
    pub draft: i64,
    pub pending: i64,
    pub published: i64,
    pub archived: i64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventCounts {
    pub upcoming: i64,
    pub ongoing: i64,
    pub completed: i64,
    pub cancelled: i64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub users: i64,
    pub blogs: BlogCounts,
    pub events: EventCounts,
    pub registrations: i64,
    pub comments: i64,
}

// -- Categories --

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub kind: Option<CategoryKind>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub kind: CategoryKind,
    pub description: Option<String>,
}

/// Keeps an explicit `null` apart from a missing field: missing stays `None`
/// through `#[serde(default)]`, `null` becomes `Some(None)`.
fn clearable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_clears_and_missing_keeps() {
        let req: UpdateEventRequest =
            serde_json::from_str(r#"{"max_participants": null, "end_date": null}"#).unwrap();
        assert_eq!(req.max_participants, Some(None));
        assert_eq!(req.end_date, Some(None));
        assert_eq!(req.registration_deadline, None);

        let req: UpdateEventRequest = serde_json::from_str(r#"{"max_participants": 40}"#).unwrap();
        assert_eq!(req.max_participants, Some(Some(40)));

        let req: UpdateBlogRequest = serde_json::from_str(r#"{"category_id": null}"#).unwrap();
        assert_eq!(req.category_id, Some(None));
    }
}
