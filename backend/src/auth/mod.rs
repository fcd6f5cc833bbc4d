use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::axum_http::error_responses::AppError;

const ACCEPTED_AUDIENCES: [&str; 2] = ["authenticated", "service_role"];

/// Supabase JWT settings, installed on the router as an `Extension`.
#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: Arc<String>,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: Arc::new(jwt_secret.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupabaseClaims {
    pub sub: String,
    pub role: String,
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,
    #[error("Invalid Authorization header format")]
    InvalidHeader,
    #[error("JWT validation failed: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("Invalid user ID in token")]
    InvalidSubject,
}

pub fn validate_supabase_jwt(token: &str, secret: &str) -> Result<SupabaseClaims, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&ACCEPTED_AUDIENCES);

    let token_data = decode::<SupabaseClaims>(token, &decoding_key, &validation)?;
    Ok(token_data.claims)
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let auth_str = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader)?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidHeader)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(config) = parts.extensions.get::<AuthConfig>().cloned() else {
            error!("auth: AuthConfig extension is not installed on the router");
            return Err(AppError::Internal(anyhow::anyhow!(
                "auth config missing from request extensions"
            )));
        };

        let authenticate = || -> Result<AuthUser, AuthError> {
            let token = bearer_token(parts)?;
            let claims = validate_supabase_jwt(token, &config.jwt_secret)?;
            let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidSubject)?;
            Ok(AuthUser {
                user_id,
                email: claims.email,
                role: claims.role,
            })
        };

        authenticate().map_err(|err| {
            debug!(error = %err, "auth: request rejected");
            AppError::Unauthorized
        })
    }
}

#[cfg(test)]
mod tests;
