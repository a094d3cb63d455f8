//! Account registration and token issuance.

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Duration;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};
use uuid::Uuid;

use pantry_types::api::{Claims, LoginRequest, RegisterRequest, TokenResponse};

use crate::error::{ApiError, FieldErrors};
use crate::state::{AppState, with_db};

const MIN_PASSWORD_LEN: usize = 5;

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let email = normalize_email(&req.email);

    let mut errors = FieldErrors::default();
    if !is_plausible_email(&email) {
        errors.add("email", "Enter a valid email address.");
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Ensure this field has at least {} characters.", MIN_PASSWORD_LEN),
        );
    }
    errors.into_result()?;

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::Internal
        })?
        .to_string();

    let user_id = Uuid::new_v4();
    let stored_email = email.clone();
    // The UNIQUE constraint on email decides; a concurrent registration
    // for the same address loses here.
    let created = with_db(&state, "create user", move |db| {
        db.create_user(&user_id.to_string(), &stored_email, &password_hash)
    })
    .await?;
    if !created {
        return Err(ApiError::Conflict("A user with that email already exists".into()));
    }

    info!("Registered user {}", user_id);

    let token = issue_token(&state.jwt_secret, user_id, &email, state.token_ttl).map_err(|e| {
        error!("Failed to issue token: {}", e);
        ApiError::Internal
    })?;

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse {
            user_id,
            email,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let email = normalize_email(&req.email);
    let user = with_db(&state, "look up user", move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
        error!("Stored password hash is unreadable: {}", e);
        ApiError::Internal
    })?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user.id.parse().map_err(|_| ApiError::Internal)?;

    let token = issue_token(&state.jwt_secret, user_id, &user.email, state.token_ttl).map_err(|e| {
        error!("Failed to issue token: {}", e);
        ApiError::Internal
    })?;

    Ok(Json(TokenResponse {
        user_id,
        email: user.email,
        token,
    }))
}

/// Sign an HS256 token for `user_id` that expires after `ttl`.
pub fn issue_token(secret: &str, user_id: Uuid, email: &str, ttl: Duration) -> anyhow::Result<String> {
    let expires = chrono::Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("Token lifetime {} is out of range", ttl))?;
    let exp = usize::try_from(expires.timestamp())
        .map_err(|_| anyhow::anyhow!("Token expiry {} is before the epoch", expires))?;

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Trim and lowercase the domain part; the local part is left as typed.
fn normalize_email(raw: &str) -> String {
    let raw = raw.trim();
    match raw.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => raw.to_string(),
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
