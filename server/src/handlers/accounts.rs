use axum::extract::State;
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{password, token, CurrentUser};
use crate::db;
use crate::models::{UserPayload, UserView};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::JsonBody;
use crate::utils::response::{created, no_content, ok};
use crate::validation::{FieldErrors, BLANK, REQUIRED};

const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

#[derive(Debug, Default, Deserialize)]
pub struct LoginPayload {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

impl LoginPayload {
    fn into_credentials(self) -> AppResult<(String, String)> {
        let mut errors = FieldErrors::default();
        let username = errors.required_text("username", self.username.as_deref(), None);
        let password = match self.password {
            Some(p) if !p.is_empty() => Some(p),
            Some(_) => {
                errors.add("password", BLANK);
                None
            }
            None => {
                errors.add("password", REQUIRED);
                None
            }
        };
        errors.into_result()?;
        Ok((username.unwrap_or_default(), password.unwrap_or_default()))
    }
}

/// Open sign-up. The password is stored as an Argon2 hash only.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<UserPayload>,
) -> AppResult<Response> {
    let new_user = payload.into_new_user()?;
    let password_hash = password::hash_password(new_user.password).await?;
    let user = db::users::insert(&state.pool, &new_user.username, &new_user.email, &password_hash)
        .await?;

    info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(created(UserView::from(&user)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginPayload>,
) -> AppResult<Response> {
    let (username, password) = payload.into_credentials()?;

    let user = db::users::find_by_username(&state.pool, &username)
        .await?
        .filter(|user| user.is_active);
    let Some(user) = user else {
        return Err(AppError::field(FieldErrors::NON_FIELD, INVALID_CREDENTIALS));
    };
    if !password::verify_password(password, user.password_hash.clone()).await? {
        return Err(AppError::field(FieldErrors::NON_FIELD, INVALID_CREDENTIALS));
    }

    let now = Utc::now();
    let purged = db::sessions::purge_expired(&state.pool, now).await?;
    if purged > 0 {
        tracing::debug!(purged, "Expired sessions removed");
    }

    let issued = token::issue();
    let expires_at = now + state.config.session_ttl;
    db::sessions::create(&state.pool, user.id, &issued.digest, expires_at).await?;

    info!(user_id = %user.id, "User logged in");
    Ok(ok(LoginResponse {
        token: issued.token,
        expires_at,
        user: UserView::from(&user),
    }))
}

/// Revokes the token used for this request.
pub async fn logout(State(state): State<AppState>, current: CurrentUser) -> AppResult<Response> {
    db::sessions::delete(&state.pool, &current.token_digest).await?;
    info!(user_id = %current.id(), "User logged out");
    Ok(no_content())
}
