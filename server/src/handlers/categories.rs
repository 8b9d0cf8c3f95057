use axum::extract::{OriginalUri, State};
use axum::response::Response;
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db;
use crate::models::CategoryPayload;
use crate::pagination::{Page, PageParams};
use crate::policy::{authorize, Action, Resource, CATEGORY_POLICIES};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::{JsonBody, PathParams, QueryParams};
use crate::utils::response::{created, no_content, ok};

pub async fn list_categories(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    QueryParams(paging): QueryParams<PageParams>,
) -> AppResult<Response> {
    let page = paging.resolve()?;
    let (categories, count) = db::categories::list(&state.pool, page).await?;
    page.ensure_within(count)?;
    Ok(ok(Page::new(categories, count, page, &uri)))
}

pub async fn retrieve_category(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Response> {
    let category = db::categories::find(&state.pool, id)
        .await?
        .ok_or_else(AppError::not_found)?;
    Ok(ok(category))
}

/// Staff only.
pub async fn create_category(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(payload): JsonBody<CategoryPayload>,
) -> AppResult<Response> {
    authorize(
        CATEGORY_POLICIES,
        Some(&current.actor()),
        Action::Write,
        &Resource::Category,
    )?;

    let name = payload.into_name()?;
    let category = db::categories::insert(&state.pool, &name).await?;
    info!(category_id = %category.id, name = %category.name, "Category created");
    Ok(created(category))
}

/// Staff only. Events in the category keep existing without one.
pub async fn delete_category(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Response> {
    authorize(
        CATEGORY_POLICIES,
        Some(&current.actor()),
        Action::Write,
        &Resource::Category,
    )?;

    if !db::categories::delete(&state.pool, id).await? {
        return Err(AppError::not_found());
    }
    info!(category_id = %id, "Category deleted");
    Ok(no_content())
}
