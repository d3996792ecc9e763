use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;

use ncit_gateway::connection;

use crate::auth::{AppState, verify_token};
use crate::error::AppError;
use crate::middleware::bearer_token;

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    pub token: Option<String>,
}

/// Upgrade to the realtime gateway. A token in the header or query string
/// authenticates up front; without one the client must send `Identify`.
pub async fn upgrade(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let dispatcher = state.dispatcher.clone();

    let Some(token) = bearer_token(&headers).or(query.token) else {
        let jwt_secret = state.jwt_secret.clone();
        return Ok(ws.on_upgrade(move |socket| {
            connection::handle_connection(socket, dispatcher, jwt_secret)
        }));
    };

    let claims = verify_token(&state.jwt_secret, &token)
        .ok_or_else(|| AppError::unauthorized("invalid or expired token"))?;

    Ok(ws.on_upgrade(move |socket| {
        connection::handle_connection_authenticated(socket, dispatcher, claims.sub)
    }))
}
