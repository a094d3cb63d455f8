use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::warn;
use uuid::Uuid;

use pantry_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// The authenticated caller. Every owner-scoped query is built from this.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
}

/// Extract and validate the token from the Authorization header, confirm the
/// account still exists, and attach a [`Principal`] to the request.
///
/// Accepts both `Bearer <token>` and `Token <token>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("Token "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!("Rejected token: {}", e);
        ApiError::Unauthorized
    })?
    .claims;

    let user_id = claims.sub.to_string();
    let user = with_db(&state, "look up token owner", move |db| db.get_user_by_id(&user_id))
        .await?
        .ok_or_else(|| {
            warn!("Token for unknown user {}", claims.sub);
            ApiError::Unauthorized
        })?;

    req.extensions_mut().insert(Principal {
        id: claims.sub,
        email: user.email,
    });
    Ok(next.run(req).await)
}
