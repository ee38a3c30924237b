//! Bearer-token authentication
//!
//! Validates the HS256 JWTs issued by the account service and extracts the
//! stable viewer identity (`sub` claim). The gateway trusts this identity;
//! it never mints tokens of its own.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::server::error::ApiError;

/// Claims the gateway cares about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Stable viewer identity
    pub sub: String,
    /// Expiry, seconds since the epoch
    pub exp: usize,
}

/// Token validation failure
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed Authorization header")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Validates bearer tokens against the shared signing secret
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl TokenValidator {
    /// Create a validator for HS256 tokens signed with `secret`
    pub fn new(secret: &[u8]) -> Self {
        // Expiry validation is on by default; pin the algorithm so a token
        // cannot downgrade it.
        let validation = Validation::new(Algorithm::HS256);
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Validate a bearer token and return its claims
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(req: &Request) -> Result<&str, AuthError> {
    req.headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)
}

/// Authentication middleware for protected routes
///
/// Validates the bearer token and stores [`Claims`] in request extensions
/// for downstream handlers. Responds 401 if the token is missing, invalid
/// or expired.
pub async fn require_auth(
    State(validator): State<std::sync::Arc<TokenValidator>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_bearer_token(&req).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting unauthenticated request");
        ApiError::Unauthorized
    })?;

    let claims = validator.validate(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting invalid token");
        ApiError::Unauthorized
    })?;

    tracing::debug!(viewer = %claims.sub, "Authenticated");
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
