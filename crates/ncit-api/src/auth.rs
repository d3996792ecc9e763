use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::info;
use uuid::Uuid;

use ncit_db::Database;
use ncit_gateway::Dispatcher;
use ncit_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest, UpdateProfileRequest};
use ncit_types::models::{Profile, PublicProfile, UserRole};

use crate::error::AppError;
use crate::run_db;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub dispatcher: Dispatcher,
}

const MIN_PASSWORD_LEN: usize = 8;
const MAX_NAME_LEN: usize = 100;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&req.email)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at least 8 characters"));
    }
    let full_name = validate_name(&req.full_name)?;

    // Check if email is taken
    let lookup = email.clone();
    if run_db(&state, move |db| db.get_user_by_email(&lookup)).await?.is_some() {
        return Err(AppError::conflict("an account with this email already exists"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let profile = insert_student(&state, email, password_hash, full_name).await?;

    let token = create_token(&state.jwt_secret, &profile, state.token_ttl)?;
    info!("Registered {} ({})", profile.email, profile.id);

    Ok((StatusCode::CREATED, Json(AuthResponse { token, profile })))
}

/// A concurrent sign-up can take the email after the lookup in `register`;
/// the unique index has the final say.
async fn insert_student(
    state: &AppState,
    email: String,
    password_hash: String,
    full_name: String,
) -> Result<Profile, AppError> {
    let user_id = Uuid::new_v4();
    run_db(state, move |db| {
        db.create_user(user_id, &email, &password_hash, &full_name, UserRole::Student)
    })
    .await?
    .ok_or_else(|| AppError::conflict("an account with this email already exists"))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = req.email.trim().to_lowercase();
    let user = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid email or password"))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored password hash is malformed: {}", e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::unauthorized("invalid email or password"))?;

    let token = create_token(&state.jwt_secret, &user.profile, state.token_ttl)?;

    Ok(Json(AuthResponse {
        token,
        profile: user.profile,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Profile>, AppError> {
    let user_id = claims.sub;
    let profile = run_db(&state, move |db| db.get_profile(user_id))
        .await?
        .ok_or_else(|| AppError::not_found("profile not found"))?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, AppError> {
    let full_name = req.full_name.as_deref().map(validate_name).transpose()?;
    let user_id = claims.sub;

    let profile = run_db(&state, move |db| {
        db.update_profile(
            user_id,
            full_name.as_deref(),
            req.avatar_url.as_deref(),
            req.bio.as_deref(),
            req.department.as_deref(),
        )
    })
    .await?
    .ok_or_else(|| AppError::not_found("profile not found"))?;

    Ok(Json(profile))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PublicProfile>, AppError> {
    let profile = run_db(&state, move |db| db.get_profile(user_id))
        .await?
        .ok_or_else(|| AppError::not_found("profile not found"))?;
    Ok(Json(profile.into()))
}

pub fn create_token(secret: &str, profile: &Profile, ttl: chrono::Duration) -> anyhow::Result<String> {
    let claims = Claims {
        sub: profile.id,
        email: profile.email.clone(),
        role: profile.role,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Decode and validate a token. `None` for anything malformed or expired.
pub fn verify_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
}

fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::bad_request("invalid email address"));
    }
    Ok(email)
}

fn validate_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("full name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::bad_request("full name is too long"));
    }
    Ok(name.to_string())
}
