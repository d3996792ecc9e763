use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;
use uuid::Uuid;

use ncit_types::api::{RejectBlogRequest, SetBlogStatusRequest, StatusQuery};
use ncit_types::events::GatewayEvent;
use ncit_types::models::{Blog, BlogStatus, NotificationKind};

use crate::auth::AppState;
use crate::blogs::find_blog;
use crate::error::AppError;
use crate::notifications::notify_user;
use crate::run_db;

/// Moderation queue. Defaults to pending blogs, oldest submission first.
pub async fn list_for_review(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<Blog>>, AppError> {
    let status = query.status.unwrap_or(BlogStatus::Pending);
    let blogs = run_db(&state, move |db| db.list_blogs_by_status(Some(status))).await?;
    Ok(Json(blogs))
}

pub async fn approve_blog(
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<Blog>, AppError> {
    let current = find_blog(&state, blog_id).await?;
    if current.status != BlogStatus::Pending {
        return Err(AppError::conflict("only pending blogs can be approved"));
    }

    let blog = apply_status(&state, blog_id, BlogStatus::Published, None).await?;
    info!("Blog {} approved", blog_id);

    notify_user(
        &state,
        blog.author_id,
        NotificationKind::BlogApproved,
        "Your blog was published",
        format!("\"{}\" is now live", blog.title),
        Some(format!("/blogs/{}", blog.id)),
    )
    .await;

    Ok(Json(blog))
}

pub async fn reject_blog(
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
    Json(req): Json<RejectBlogRequest>,
) -> Result<Json<Blog>, AppError> {
    let reason = req.reason.trim().to_string();
    if reason.is_empty() {
        return Err(AppError::bad_request("a rejection reason is required"));
    }

    let current = find_blog(&state, blog_id).await?;
    if current.status != BlogStatus::Pending {
        return Err(AppError::conflict("only pending blogs can be rejected"));
    }

    let blog = apply_status(&state, blog_id, BlogStatus::Archived, Some(reason.clone())).await?;
    info!("Blog {} rejected", blog_id);

    notify_user(
        &state,
        blog.author_id,
        NotificationKind::BlogRejected,
        "Your blog was not approved",
        format!("\"{}\" was rejected: {}", blog.title, reason),
        Some(format!("/blogs/{}", blog.id)),
    )
    .await;

    Ok(Json(blog))
}

/// Admin override: any status may be assigned from any status.
pub async fn set_blog_status(
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
    Json(req): Json<SetBlogStatusRequest>,
) -> Result<Json<Blog>, AppError> {
    let blog = apply_status(&state, blog_id, req.status, None).await?;
    info!("Blog {} status set to {}", blog_id, blog.status);
    Ok(Json(blog))
}

async fn apply_status(
    state: &AppState,
    blog_id: Uuid,
    status: BlogStatus,
    reason: Option<String>,
) -> Result<Blog, AppError> {
    let blog = run_db(state, move |db| {
        if !db.set_blog_status(blog_id, status, reason.as_deref())? {
            return Ok(None);
        }
        db.get_blog(blog_id)
    })
    .await?
    .ok_or_else(|| AppError::not_found("blog not found"))?;

    state.dispatcher.broadcast(GatewayEvent::BlogStatusChange {
        blog_id,
        status: blog.status,
    });
    Ok(blog)
}
