use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use uuid::Uuid;

use ncit_types::api::{Claims, CreateCommentRequest, LikeResponse, UpdateCommentRequest};
use ncit_types::events::GatewayEvent;
use ncit_types::models::{BlogStatus, Comment, NotificationKind};

use crate::auth::AppState;
use crate::blogs::{ensure_visible, find_blog};
use crate::error::AppError;
use crate::middleware::is_admin;
use crate::notifications::notify_user;
use crate::run_db;

const MAX_COMMENT_LEN: usize = 5000;

pub async fn list_comments(
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Vec<Comment>>, AppError> {
    let blog = find_blog(&state, blog_id).await?;
    ensure_visible(&state, &blog, &headers).await?;
    let flat = run_db(&state, move |db| db.list_comments(blog_id)).await?;
    Ok(Json(thread_comments(flat)))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let content = validate_content(&req.content)?;
    let blog = find_blog(&state, blog_id).await?;
    if blog.status != BlogStatus::Published {
        return Err(AppError::not_found("blog not found"));
    }

    // Replies hang off the root of the thread, so nesting stays one level deep
    let parent = match req.parent_id {
        Some(parent_id) => {
            let parent = find_comment(&state, parent_id).await?;
            if parent.blog_id != blog_id {
                return Err(AppError::bad_request("parent comment belongs to another blog"));
            }
            Some(parent)
        }
        None => None,
    };
    let root_id = parent.as_ref().map(|p| p.parent_id.unwrap_or(p.id));

    let comment_id = Uuid::new_v4();
    let author_id = claims.sub;
    let comment = run_db(&state, move |db| {
        db.insert_comment(comment_id, blog_id, author_id, root_id, &content)?;
        db.get_comment(comment_id)
    })
    .await?
    .ok_or_else(|| anyhow::anyhow!("comment vanished after insert: {}", comment_id))?;

    state.dispatcher.broadcast(GatewayEvent::CommentCreate {
        blog_id,
        comment: comment.clone(),
    });

    let link = Some(format!("/blogs/{}", blog_id));
    match parent {
        Some(parent) if parent.author_id != author_id => {
            notify_user(
                &state,
                parent.author_id,
                NotificationKind::CommentReply,
                "New reply to your comment",
                format!("{} replied on \"{}\"", comment.author_name, blog.title),
                link,
            )
            .await;
        }
        None if blog.author_id != author_id => {
            notify_user(
                &state,
                blog.author_id,
                NotificationKind::Comment,
                "New comment on your blog",
                format!("{} commented on \"{}\"", comment.author_name, blog.title),
                link,
            )
            .await;
        }
        _ => {}
    }

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<Uuid>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let content = validate_content(&req.content)?;
    let current = find_comment(&state, comment_id).await?;
    if current.author_id != claims.sub {
        return Err(AppError::forbidden("only the author can edit this comment"));
    }

    let comment = run_db(&state, move |db| {
        db.update_comment(comment_id, &content)?;
        db.get_comment(comment_id)
    })
    .await?
    .ok_or_else(|| AppError::not_found("comment not found"))?;

    state.dispatcher.broadcast(GatewayEvent::CommentUpdate {
        blog_id: comment.blog_id,
        comment: comment.clone(),
    });
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let comment = find_comment(&state, comment_id).await?;
    if comment.author_id != claims.sub && !is_admin(&state, claims.sub).await? {
        return Err(AppError::forbidden("only the author or an admin can delete this comment"));
    }

    if !run_db(&state, move |db| db.delete_comment(comment_id)).await? {
        return Err(AppError::not_found("comment not found"));
    }

    state.dispatcher.broadcast(GatewayEvent::CommentDelete {
        blog_id: comment.blog_id,
        comment_id,
    });
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<Uuid>,
) -> Result<Json<LikeResponse>, AppError> {
    let comment = find_comment(&state, comment_id).await?;
    let user_id = claims.sub;
    let (liked, likes) =
        run_db(&state, move |db| db.toggle_comment_like(comment_id, user_id)).await?;

    state.dispatcher.broadcast(GatewayEvent::CommentLikes {
        blog_id: comment.blog_id,
        comment_id,
        likes,
    });
    Ok(Json(LikeResponse { liked, likes }))
}

/// Turn the flat, oldest-first list into top-level comments carrying their
/// replies. A reply whose parent is not a top-level comment in the list is
/// shown at the top level instead of being dropped.
pub fn thread_comments(flat: Vec<Comment>) -> Vec<Comment> {
    let roots: HashSet<Uuid> = flat
        .iter()
        .filter(|c| c.parent_id.is_none())
        .map(|c| c.id)
        .collect();

    let mut replies: HashMap<Uuid, Vec<Comment>> = HashMap::new();
    let mut threads = Vec::new();
    for comment in flat {
        match comment.parent_id {
            Some(parent) if roots.contains(&parent) => {
                replies.entry(parent).or_default().push(comment)
            }
            _ => threads.push(comment),
        }
    }

    for thread in &mut threads {
        if let Some(children) = replies.remove(&thread.id) {
            thread.replies = children;
        }
    }
    threads
}

async fn find_comment(state: &AppState, comment_id: Uuid) -> Result<Comment, AppError> {
    run_db(state, move |db| db.get_comment(comment_id))
        .await?
        .ok_or_else(|| AppError::not_found("comment not found"))
}

fn validate_content(raw: &str) -> Result<String, AppError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::bad_request("comment cannot be empty"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::bad_request("comment is too long"));
    }
    Ok(content.to_string())
}
