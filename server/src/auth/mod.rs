//! Bearer-token authentication.
//!
//! Handlers that need a caller take [`CurrentUser`]; extraction fails with a
//! 401 before the handler body runs.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::Utc;

use crate::db;
use crate::models::User;
use crate::policy::Actor;
use crate::state::AppState;
use crate::utils::error::AppError;

pub mod password;
pub mod token;

/// Token taken from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    fn parse(value: &str) -> Option<Self> {
        let (scheme, token) = value.trim().split_once(' ')?;
        let token = token.trim();
        if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
            return None;
        }
        Some(Self(token.to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(AppError::not_authenticated)?;

        header_value
            .to_str()
            .ok()
            .and_then(BearerToken::parse)
            .ok_or_else(|| {
                AppError::AuthError(
                    "Invalid authorization header. Expected 'Bearer <token>'.".to_string(),
                )
            })
    }
}

/// The user owning the presented session token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token_digest: Vec<u8>,
}

impl CurrentUser {
    pub fn id(&self) -> uuid::Uuid {
        self.user.id
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user.id,
            is_staff: self.user.is_staff,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let bearer = BearerToken::from_request_parts(parts, state).await?;
        let token_digest = token::digest(&bearer.0);

        let user = db::sessions::find_user(&state.pool, &token_digest, Utc::now())
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid token.".to_string()))?;

        if !user.is_active {
            return Err(AppError::AuthError("User inactive or deleted.".to_string()));
        }

        Ok(Self { user, token_digest })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header_value: Option<&str>) -> Result<BearerToken, AppError> {
        let mut builder = Request::builder();
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_bearer_token_extracted() {
        let token = extract(Some("Bearer abc123")).await.unwrap();
        assert_eq!(token.0, "abc123");

        let token = extract(Some("bearer  xyz ")).await.unwrap();
        assert_eq!(token.0, "xyz");
    }

    #[tokio::test]
    async fn test_missing_header_is_not_authenticated() {
        let err = extract(None).await.unwrap_err();
        assert!(
            matches!(err, AppError::AuthError(ref msg) if msg == "Authentication credentials were not provided.")
        );
    }

    #[tokio::test]
    async fn test_wrong_scheme_is_rejected() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer   ", "abc123"] {
            assert!(
                matches!(extract(Some(value)).await, Err(AppError::AuthError(_))),
                "{value}"
            );
        }
    }
}
