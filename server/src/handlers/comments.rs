use axum::extract::{OriginalUri, State};
use axum::response::Response;
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db;
use crate::models::{CommentPayload, CommentRecord, CommentView};
use crate::pagination::{Page, PageParams};
use crate::policy::{authorize, Action, Resource, COMMENT_POLICIES};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::{JsonBody, PathParams, QueryParams};
use crate::utils::response::{created, no_content, ok};

/// Comments on one event. An event without comments, or one that does not exist, yields an empty page.
pub async fn list_comments(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    PathParams(event_id): PathParams<Uuid>,
    QueryParams(paging): QueryParams<PageParams>,
) -> AppResult<Response> {
    let page = paging.resolve()?;
    let (records, count) = db::comments::list_for_event(&state.pool, event_id, page).await?;
    page.ensure_within(count)?;

    Ok(ok(Page::new(records, count, page, &uri).map(CommentView::from)))
}

/// Event and author come from the path and the session, never from the body.
pub async fn create_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(event_id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<CommentPayload>,
) -> AppResult<Response> {
    let actor = current.actor();
    if !db::events::exists(&state.pool, event_id).await? {
        return Err(AppError::not_found());
    }
    let comment = payload.into_new_comment()?;

    let record = db::comments::insert(&state.pool, event_id, actor.user_id, &comment).await?;
    info!(
        comment_id = %record.id,
        event_id = %event_id,
        user_id = %actor.user_id,
        rating = ?record.rating,
        "Comment created"
    );
    Ok(created(CommentView::from(record)))
}

pub async fn retrieve_comment(
    State(state): State<AppState>,
    PathParams((event_id, id)): PathParams<(Uuid, Uuid)>,
) -> AppResult<Response> {
    let record = load(&state, event_id, id).await?;
    Ok(ok(CommentView::from(record)))
}

pub async fn replace_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams((event_id, id)): PathParams<(Uuid, Uuid)>,
    JsonBody(payload): JsonBody<CommentPayload>,
) -> AppResult<Response> {
    update_comment(state, current, event_id, id, payload, false).await
}

pub async fn patch_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams((event_id, id)): PathParams<(Uuid, Uuid)>,
    JsonBody(payload): JsonBody<CommentPayload>,
) -> AppResult<Response> {
    update_comment(state, current, event_id, id, payload, true).await
}

async fn update_comment(
    state: AppState,
    current: CurrentUser,
    event_id: Uuid,
    id: Uuid,
    payload: CommentPayload,
    partial: bool,
) -> AppResult<Response> {
    let record = load_for_author(&state, &current, event_id, id).await?;
    let changes = payload.into_changes(partial)?;

    let updated = db::comments::update(&state.pool, record.id, &changes)
        .await?
        .ok_or_else(AppError::not_found)?;
    info!(comment_id = %updated.id, partial, "Comment updated");
    Ok(ok(CommentView::from(updated)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams((event_id, id)): PathParams<(Uuid, Uuid)>,
) -> AppResult<Response> {
    let record = load_for_author(&state, &current, event_id, id).await?;
    if !db::comments::delete(&state.pool, record.id).await? {
        return Err(AppError::not_found());
    }

    info!(comment_id = %record.id, event_id = %event_id, "Comment deleted");
    Ok(no_content())
}

async fn load(state: &AppState, event_id: Uuid, id: Uuid) -> AppResult<CommentRecord> {
    db::comments::find(&state.pool, event_id, id)
        .await?
        .ok_or_else(AppError::not_found)
}

async fn load_for_author(
    state: &AppState,
    current: &CurrentUser,
    event_id: Uuid,
    id: Uuid,
) -> AppResult<CommentRecord> {
    let record = load(state, event_id, id).await?;
    authorize(
        COMMENT_POLICIES,
        Some(&current.actor()),
        Action::Write,
        &Resource::Comment {
            author_id: record.user_id,
        },
    )?;
    Ok(record)
}
