use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use ncit_types::api::{CategoryQuery, CreateCategoryRequest};
use ncit_types::models::{Category, CategoryKind};

use crate::auth::AppState;
use crate::error::AppError;
use crate::run_db;

pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<Category>>, AppError> {
    let categories = run_db(&state, move |db| db.list_categories(query.kind)).await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("category name is required"));
    }
    let description = req
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let id = Uuid::new_v4();
    let kind = req.kind;
    let category = run_db(&state, move |db| {
        db.create_category(id, &name, kind, description.as_deref())
    })
    .await?
    .ok_or_else(|| AppError::conflict("a category with this name already exists"))?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !run_db(&state, move |db| db.delete_category(category_id)).await? {
        return Err(AppError::not_found("category not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// A category reference must exist and be of the right kind.
pub(crate) async fn ensure_category(
    state: &AppState,
    category_id: Uuid,
    kind: CategoryKind,
) -> Result<(), AppError> {
    let category = run_db(state, move |db| db.get_category(category_id))
        .await?
        .ok_or_else(|| AppError::bad_request("unknown category"))?;
    if category.kind != kind {
        return Err(AppError::bad_request(format!("category is not a {} category", kind)));
    }
    Ok(())
}
