use axum::extract::State;
use axum::response::Response;
use tracing::info;
use uuid::Uuid;

use crate::auth::{password, CurrentUser};
use crate::db;
use crate::models::{User, UserPayload, UserView};
use crate::policy::{authorize, Action, Resource, USER_POLICIES};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::{JsonBody, PathParams};
use crate::utils::response::{no_content, ok};

/// Loads the target account and checks the caller may act on it.
async fn load_own_account(
    state: &AppState,
    current: &CurrentUser,
    id: Uuid,
    action: Action,
) -> AppResult<User> {
    let user = db::users::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(AppError::not_found)?;
    authorize(
        USER_POLICIES,
        Some(&current.actor()),
        action,
        &Resource::User { id: user.id },
    )?;
    Ok(user)
}

pub async fn retrieve_user(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Response> {
    let user = load_own_account(&state, &current, id, Action::Read).await?;
    Ok(ok(UserView::from(&user)))
}

pub async fn replace_user(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<UserPayload>,
) -> AppResult<Response> {
    update_user(state, current, id, payload, false).await
}

pub async fn patch_user(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<UserPayload>,
) -> AppResult<Response> {
    update_user(state, current, id, payload, true).await
}

async fn update_user(
    state: AppState,
    current: CurrentUser,
    id: Uuid,
    payload: UserPayload,
    partial: bool,
) -> AppResult<Response> {
    let user = load_own_account(&state, &current, id, Action::Write).await?;
    let changes = payload.into_changes(partial)?;

    let password_hash = match changes.password {
        Some(plain) => Some(password::hash_password(plain).await?),
        None => None,
    };

    let updated = db::users::update(
        &state.pool,
        user.id,
        changes.username.as_deref(),
        changes.email.as_deref(),
        password_hash.as_deref(),
    )
    .await?
    .ok_or_else(AppError::not_found)?;

    info!(
        user_id = %updated.id,
        password_changed = password_hash.is_some(),
        "User updated"
    );
    Ok(ok(UserView::from(&updated)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Response> {
    let user = load_own_account(&state, &current, id, Action::Write).await?;
    if !db::users::delete(&state.pool, user.id).await? {
        return Err(AppError::not_found());
    }

    info!(user_id = %user.id, "User deleted");
    Ok(no_content())
}
