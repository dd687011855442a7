use axum::extract::State;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::UserId;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user identity
    pub sub: String,
    /// Expiration time (unix timestamp)
    pub exp: i64,
    /// Optional display name embedded in the credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Claims {
    /// The verified caller identity. A subject carrying the reserved
    /// conversation-key separator is treated as an invalid credential, not
    /// let through to collide keys downstream.
    pub fn user_id(&self) -> Result<UserId, AppError> {
        UserId::try_from(self.sub.clone()).map_err(|_| AppError::InvalidCredentials)
    }
}

/// Validate a bearer credential and extract the caller identity (HS256).
///
/// Malformed, expired or badly-signed tokens all map to
/// `InvalidCredentials`; there is no fallback identity of any kind.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::InvalidCredentials)
}

/// Pull a bearer token out of an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ")
}

/// Middleware to authenticate requests and add the caller's `UserId` to
/// request extensions. Missing or invalid credentials are hard failures.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, AppError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::MissingCredentials)?;

    let token = bearer_token(auth_header).ok_or(AppError::MissingCredentials)?;

    let claims = verify_token(token, &state.config.jwt_secret)?;

    req.extensions_mut().insert(claims.user_id()?);

    Ok(next.run(req).await)
}
