pub mod admin;
pub mod auth;
pub mod blogs;
pub mod categories;
pub mod comments;
pub mod error;
pub mod events;
pub mod gateway;
pub mod middleware;
pub mod moderation;
pub mod notifications;
pub mod registrations;

#[cfg(test)]
pub(crate) mod testing;

use axum::{
    Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tracing::error;

use ncit_db::Database;

use crate::auth::AppState;
use crate::error::AppError;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Every HTTP route and the gateway, with state attached. CORS and tracing
/// layers are left to the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/gateway", get(gateway::upgrade))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/profiles/{user_id}", get(auth::get_profile))
        .route("/blogs", get(blogs::list_blogs))
        .route("/blogs/{blog_id}", get(blogs::get_blog))
        .route("/blogs/{blog_id}/comments", get(comments::list_comments))
        .route("/events", get(events::list_events))
        .route("/events/{event_id}", get(events::get_event))
        .route("/categories", get(categories::list_categories))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/profile", put(auth::update_profile))
        .route("/blogs", post(blogs::create_blog))
        .route("/blogs/mine", get(blogs::list_my_blogs))
        .route("/blogs/{blog_id}", put(blogs::update_blog).delete(blogs::delete_blog))
        .route("/blogs/{blog_id}/submit", post(blogs::submit_blog))
        .route("/blogs/{blog_id}/like", post(blogs::like_blog))
        .route("/blogs/{blog_id}/comments", post(comments::create_comment))
        .route(
            "/comments/{comment_id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/comments/{comment_id}/like", post(comments::like_comment))
        .route(
            "/events/{event_id}/register",
            post(registrations::register).delete(registrations::cancel_registration),
        )
        .route("/events/{event_id}/registration", get(registrations::registration_status))
        .route("/me/registrations", get(registrations::my_registrations))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{notification_id}", delete(notifications::delete_notification))
        .route("/notifications/{notification_id}/read", post(notifications::mark_read))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state.clone());

    // Layers run bottom-up: require_auth first, then the role check
    let admin_routes = Router::new()
        .route("/admin/blogs", get(moderation::list_for_review))
        .route("/admin/blogs/{blog_id}/approve", post(moderation::approve_blog))
        .route("/admin/blogs/{blog_id}/reject", post(moderation::reject_blog))
        .route("/admin/blogs/{blog_id}/status", put(moderation::set_blog_status))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{user_id}", delete(admin::delete_user))
        .route("/admin/users/{user_id}/role", put(admin::set_role))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/announcements", post(admin::announce))
        .route("/events", post(events::create_event))
        .route("/events/{event_id}", put(events::update_event).delete(events::delete_event))
        .route("/events/{event_id}/status", put(events::set_event_status))
        .route("/events/{event_id}/registrations", get(events::list_registrants))
        .route("/categories", post(categories::create_category))
        .route("/categories/{category_id}", delete(categories::delete_category))
        .layer(from_fn_with_state(state.clone(), middleware::require_admin))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "online_users": state.dispatcher.online_count().await,
    }))
}

/// Run a blocking database call off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("database task failed")
        })?
        .map_err(AppError::from)
}

/// Resolve optional paging parameters into (limit, offset).
pub(crate) fn clamp_page(limit: Option<u32>, offset: Option<u32>) -> (u32, u32) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (limit, offset.unwrap_or(0))
}
