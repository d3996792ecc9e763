use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use ncit_content::{DEFAULT_EXCERPT_LEN, generate_excerpt, normalize_tags};
use ncit_db::models::{BlogFilter, BlogInput};
use ncit_types::api::{BlogListQuery, Claims, CreateBlogRequest, LikeResponse, UpdateBlogRequest};
use ncit_types::events::GatewayEvent;
use ncit_types::models::{Blog, BlogStatus, CategoryKind, NotificationKind};

use crate::auth::AppState;
use crate::categories::ensure_category;
use crate::error::AppError;
use crate::middleware::{is_admin, optional_claims};
use crate::notifications::notify_admins;
use crate::{clamp_page, run_db};

const MAX_TITLE_LEN: usize = 200;

pub async fn list_blogs(
    State(state): State<AppState>,
    Query(query): Query<BlogListQuery>,
) -> Result<Json<Vec<Blog>>, AppError> {
    let (limit, offset) = clamp_page(query.limit, query.offset);
    let filter = BlogFilter {
        category: query.category,
        tag: query.tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()),
        search: query.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        author: query.author,
        limit,
        offset,
    };
    let blogs = run_db(&state, move |db| db.list_published(&filter)).await?;
    Ok(Json(blogs))
}

/// Published blogs are public and count a view per fetch. Anything else is
/// only visible to its author or an admin.
pub async fn get_blog(
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Blog>, AppError> {
    let mut blog = find_blog(&state, blog_id).await?;

    if blog.status == BlogStatus::Published {
        blog.views = run_db(&state, move |db| db.increment_blog_views(blog_id)).await?;
        return Ok(Json(blog));
    }

    ensure_visible(&state, &blog, &headers).await?;
    Ok(Json(blog))
}

/// Unpublished blogs read as missing to everyone but the author and admins.
pub(crate) async fn ensure_visible(
    state: &AppState,
    blog: &Blog,
    headers: &HeaderMap,
) -> Result<(), AppError> {
    if blog.status == BlogStatus::Published {
        return Ok(());
    }
    let allowed = match optional_claims(state, headers).map(|c| c.sub) {
        Some(user_id) if user_id == blog.author_id => true,
        Some(user_id) => is_admin(state, user_id).await?,
        None => false,
    };
    if !allowed {
        return Err(AppError::not_found("blog not found"));
    }
    Ok(())
}

pub async fn list_my_blogs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Blog>>, AppError> {
    let author_id = claims.sub;
    let blogs = run_db(&state, move |db| db.list_blogs_by_author(author_id)).await?;
    Ok(Json(blogs))
}

pub async fn create_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBlogRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = req.status.unwrap_or(BlogStatus::Draft);
    if !matches!(status, BlogStatus::Draft | BlogStatus::Pending) {
        return Err(AppError::bad_request("new blogs must be draft or pending"));
    }

    let title = validate_title(&req.title)?;
    let content = validate_content(&req.content)?;
    if let Some(category_id) = req.category_id {
        ensure_category(&state, category_id, CategoryKind::Blog).await?;
    }

    let excerpt = explicit_excerpt(req.excerpt.as_deref())
        .unwrap_or_else(|| generate_excerpt(&content, DEFAULT_EXCERPT_LEN));
    let input = BlogInput {
        title,
        content,
        excerpt,
        category_id: req.category_id,
        tags: normalize_tags(&req.tags),
        images: clean_list(req.images),
        status,
    };

    let blog_id = Uuid::new_v4();
    let author_id = claims.sub;
    let blog = run_db(&state, move |db| {
        db.insert_blog(blog_id, author_id, &input)?;
        db.get_blog(blog_id)
    })
    .await?
    .ok_or_else(|| anyhow::anyhow!("blog vanished after insert: {}", blog_id))?;

    info!("Blog {} created by {} as {}", blog.id, author_id, blog.status);

    if blog.status == BlogStatus::Pending {
        announce_submission(&state, &blog).await;
    }

    Ok((StatusCode::CREATED, Json(blog)))
}

pub async fn update_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
    Json(req): Json<UpdateBlogRequest>,
) -> Result<Json<Blog>, AppError> {
    let current = find_blog(&state, blog_id).await?;
    if current.author_id != claims.sub {
        return Err(AppError::forbidden("only the author can edit this blog"));
    }

    let status = req.status.unwrap_or(current.status);
    if !current.status.author_may_move_to(status) {
        return Err(AppError::forbidden(format!(
            "cannot move a blog from {} to {}",
            current.status, status
        )));
    }

    let title = match req.title.as_deref() {
        Some(title) => validate_title(title)?,
        None => current.title.clone(),
    };
    let content_changed = req.content.is_some();
    let content = match req.content.as_deref() {
        Some(content) => validate_content(content)?,
        None => current.content.clone(),
    };
    if let Some(Some(category_id)) = req.category_id {
        ensure_category(&state, category_id, CategoryKind::Blog).await?;
    }

    // An explicit excerpt wins; otherwise new content gets a fresh one
    let excerpt = match explicit_excerpt(req.excerpt.as_deref()) {
        Some(excerpt) => excerpt,
        None if content_changed => generate_excerpt(&content, DEFAULT_EXCERPT_LEN),
        None => current.excerpt.clone(),
    };

    // Resubmitting a rejected blog starts a fresh review
    let rejection_reason = if current.status == BlogStatus::Archived && status != BlogStatus::Archived {
        None
    } else {
        current.rejection_reason.clone()
    };

    let input = BlogInput {
        title,
        content,
        excerpt,
        category_id: req.category_id.unwrap_or(current.category_id),
        tags: req.tags.as_deref().map(normalize_tags).unwrap_or_else(|| current.tags.clone()),
        images: req.images.map(clean_list).unwrap_or_else(|| current.images.clone()),
        status,
    };

    let blog = run_db(&state, move |db| {
        db.update_blog(blog_id, &input, rejection_reason.as_deref())?;
        db.get_blog(blog_id)
    })
    .await?
    .ok_or_else(|| AppError::not_found("blog not found"))?;

    if status == BlogStatus::Pending && current.status != BlogStatus::Pending {
        announce_submission(&state, &blog).await;
    }

    Ok(Json(blog))
}

/// Author sends a draft (or a rejected blog) to the moderation queue.
pub async fn submit_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<Blog>, AppError> {
    let current = find_blog(&state, blog_id).await?;
    if current.author_id != claims.sub {
        return Err(AppError::forbidden("only the author can submit this blog"));
    }
    match current.status {
        BlogStatus::Draft | BlogStatus::Archived => {}
        BlogStatus::Pending => return Err(AppError::conflict("blog is already awaiting review")),
        BlogStatus::Published => return Err(AppError::conflict("blog is already published")),
    }

    let blog = run_db(&state, move |db| {
        db.set_blog_status(blog_id, BlogStatus::Pending, None)?;
        db.get_blog(blog_id)
    })
    .await?
    .ok_or_else(|| AppError::not_found("blog not found"))?;

    announce_submission(&state, &blog).await;
    Ok(Json(blog))
}

pub async fn delete_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let blog = find_blog(&state, blog_id).await?;
    if blog.author_id != claims.sub && !is_admin(&state, claims.sub).await? {
        return Err(AppError::forbidden("only the author or an admin can delete this blog"));
    }

    if !run_db(&state, move |db| db.delete_blog(blog_id)).await? {
        return Err(AppError::not_found("blog not found"));
    }
    info!("Blog {} deleted by {}", blog_id, claims.sub);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
) -> Result<Json<LikeResponse>, AppError> {
    let blog = find_blog(&state, blog_id).await?;
    if blog.status != BlogStatus::Published {
        return Err(AppError::not_found("blog not found"));
    }

    let user_id = claims.sub;
    let (liked, likes) = run_db(&state, move |db| db.toggle_blog_like(blog_id, user_id)).await?;

    state.dispatcher.broadcast(GatewayEvent::BlogLikes { blog_id, likes });
    Ok(Json(LikeResponse { liked, likes }))
}

pub(crate) async fn find_blog(state: &AppState, blog_id: Uuid) -> Result<Blog, AppError> {
    run_db(state, move |db| db.get_blog(blog_id))
        .await?
        .ok_or_else(|| AppError::not_found("blog not found"))
}

async fn announce_submission(state: &AppState, blog: &Blog) {
    notify_admins(
        state,
        NotificationKind::BlogSubmitted,
        "New blog awaiting review".to_string(),
        format!("{} submitted \"{}\" for review", blog.author_name, blog.title),
        Some(format!("/blogs/{}", blog.id)),
    )
    .await;
}

fn validate_title(raw: &str) -> Result<String, AppError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::bad_request("title is too long"));
    }
    Ok(title.to_string())
}

fn validate_content(raw: &str) -> Result<String, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::bad_request("content is required"));
    }
    Ok(raw.to_string())
}

fn explicit_excerpt(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|e| !e.is_empty()).map(str::to_string)
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_excerpt_counts_as_missing() {
        assert_eq!(explicit_excerpt(None), None);
        assert_eq!(explicit_excerpt(Some("   ")), None);
        assert_eq!(explicit_excerpt(Some(" Short intro ")).as_deref(), Some("Short intro"));
    }

    #[test]
    fn title_and_content_validation() {
        assert_eq!(validate_title("  Hello  ").unwrap(), "Hello");
        assert!(validate_title("").is_err());
        assert!(validate_title(&"t".repeat(201)).is_err());
        assert!(validate_content(" \n ").is_err());
        assert_eq!(validate_content("# Body\n").unwrap(), "# Body\n");
    }

    #[test]
    fn image_lists_drop_blanks() {
        let images = clean_list(vec![" a.png ".into(), "".into(), "b.png".into()]);
        assert_eq!(images, vec!["a.png", "b.png"]);
    }
}
