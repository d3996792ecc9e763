use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use ncit_db::models::NewNotification;
use ncit_types::api::{AnnouncementRequest, Claims, DashboardStats, SetRoleRequest, UserSearchQuery};
use ncit_types::models::{NotificationKind, Profile, UserRole};

use crate::auth::AppState;
use crate::error::AppError;
use crate::notifications::notify;
use crate::run_db;

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<Vec<Profile>>, AppError> {
    let search = query.search.filter(|s| !s.trim().is_empty());
    let users = run_db(&state, move |db| db.list_users(search.as_deref())).await?;
    Ok(Json(users))
}

pub async fn set_role(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> Result<Json<Profile>, AppError> {
    if user_id == claims.sub && req.role != UserRole::Admin {
        return Err(AppError::bad_request("you cannot remove your own admin role"));
    }

    let role = req.role;
    let profile = run_db(&state, move |db| {
        if !db.set_role(user_id, role)? {
            return Ok(None);
        }
        db.get_profile(user_id)
    })
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))?;

    info!("{} set role of {} to {}", claims.sub, user_id, role);
    Ok(Json(profile))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if user_id == claims.sub {
        return Err(AppError::bad_request("you cannot delete your own account"));
    }
    if !run_db(&state, move |db| db.delete_user(user_id)).await? {
        return Err(AppError::not_found("user not found"));
    }
    info!("{} deleted user {}", claims.sub, user_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let stats = run_db(&state, |db| db.dashboard_stats()).await?;
    Ok(Json(stats))
}

/// One notification per registered user.
pub async fn announce(
    State(state): State<AppState>,
    Json(req): Json<AnnouncementRequest>,
) -> Result<impl IntoResponse, AppError> {
    let title = req.title.trim().to_string();
    let message = req.message.trim().to_string();
    if title.is_empty() || message.is_empty() {
        return Err(AppError::bad_request("announcement title and message are required"));
    }
    let link = req.link.filter(|l| !l.trim().is_empty());

    let recipients = run_db(&state, |db| db.all_user_ids()).await?;
    let batch = recipients
        .into_iter()
        .map(|user_id| NewNotification {
            user_id,
            kind: NotificationKind::Announcement,
            title: title.clone(),
            message: message.clone(),
            link: link.clone(),
        })
        .collect();

    let sent = notify(&state, batch).await;
    info!("Announcement \"{}\" sent to {} users", title, sent);
    Ok((StatusCode::CREATED, Json(json!({ "sent": sent }))))
}
