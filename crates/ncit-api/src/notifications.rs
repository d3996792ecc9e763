use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use ncit_db::models::NewNotification;
use ncit_types::api::{Claims, NotificationQuery, UnreadCount};
use ncit_types::events::GatewayEvent;
use ncit_types::models::{Notification, NotificationKind, UserRole};

use crate::auth::AppState;
use crate::error::AppError;
use crate::run_db;

const MAX_NOTIFICATION_PAGE: u32 = 200;

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let user_id = claims.sub;
    let limit = query.limit.clamp(1, MAX_NOTIFICATION_PAGE);
    let notifications = run_db(&state, move |db| {
        db.list_notifications(user_id, query.unread_only, limit)
    })
    .await?;
    Ok(Json(notifications))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UnreadCount>, AppError> {
    let user_id = claims.sub;
    let count = run_db(&state, move |db| db.unread_count(user_id)).await?;
    Ok(Json(UnreadCount { count }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user_id = claims.sub;
    if !run_db(&state, move |db| db.mark_notification_read(notification_id, user_id)).await? {
        return Err(AppError::not_found("notification not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.sub;
    let updated = run_db(&state, move |db| db.mark_all_notifications_read(user_id)).await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user_id = claims.sub;
    if !run_db(&state, move |db| db.delete_notification(notification_id, user_id)).await? {
        return Err(AppError::not_found("notification not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// -- Delivery --

/// Store a batch of notifications and push each one to its recipient's live
/// connections. Failures are logged and never fail the action that caused
/// them. Returns how many were stored.
pub(crate) async fn notify(state: &AppState, batch: Vec<NewNotification>) -> usize {
    if batch.is_empty() {
        return 0;
    }

    let created = match run_db(state, move |db| db.insert_notifications(&batch)).await {
        Ok(created) => created,
        Err(e) => {
            warn!("Failed to store notifications: {}", e);
            return 0;
        }
    };

    let count = created.len();
    for notification in created {
        let user_id = notification.user_id;
        state
            .dispatcher
            .send_to_user(user_id, GatewayEvent::NotificationCreate { notification })
            .await;
    }
    count
}

pub(crate) async fn notify_user(
    state: &AppState,
    user_id: Uuid,
    kind: NotificationKind,
    title: impl Into<String>,
    message: impl Into<String>,
    link: Option<String>,
) {
    notify(
        state,
        vec![NewNotification {
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            link,
        }],
    )
    .await;
}

/// Fan the same notification out to every admin.
pub(crate) async fn notify_admins(
    state: &AppState,
    kind: NotificationKind,
    title: String,
    message: String,
    link: Option<String>,
) {
    let admins = match run_db(state, |db| db.user_ids_with_role(UserRole::Admin)).await {
        Ok(ids) => ids,
        Err(e) => {
            warn!("Failed to look up admins for notification: {}", e);
            return;
        }
    };

    let batch = admins
        .into_iter()
        .map(|user_id| NewNotification {
            user_id,
            kind,
            title: title.clone(),
            message: message.clone(),
            link: link.clone(),
        })
        .collect();
    notify(state, batch).await;
}
