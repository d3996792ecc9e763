use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use ncit_types::api::Claims;

use crate::auth::{AppState, verify_token};
use crate::error::AppError;
use crate::run_db;

/// Extract and validate the JWT from the Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;

    let claims = verify_token(&state.jwt_secret, &token)
        .ok_or_else(|| AppError::unauthorized("invalid or expired token"))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Must run inside `require_auth`. The role is read from the database, not
/// the token, so a demotion applies to tokens already handed out.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = req
        .extensions()
        .get::<Claims>()
        .map(|c| c.sub)
        .ok_or_else(|| AppError::unauthorized("authentication required"))?;

    match run_db(&state, move |db| db.get_role(user_id)).await? {
        Some(role) if role.is_admin() => Ok(next.run(req).await),
        Some(_) => Err(AppError::forbidden("admin access required")),
        None => Err(AppError::unauthorized("account no longer exists")),
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

/// Claims for routes that are public but show more to a signed-in caller.
/// A bad token is treated the same as no token.
pub fn optional_claims(state: &AppState, headers: &HeaderMap) -> Option<Claims> {
    bearer_token(headers).and_then(|token| verify_token(&state.jwt_secret, &token))
}

/// True if the user currently holds the admin role.
pub(crate) async fn is_admin(state: &AppState, user_id: uuid::Uuid) -> Result<bool, AppError> {
    let role = run_db(state, move |db| db.get_role(user_id)).await?;
    Ok(role.is_some_and(|r| r.is_admin()))
}
