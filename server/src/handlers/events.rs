use axum::extract::{OriginalUri, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db;
use crate::filters::EventFilter;
use crate::models::{EventPayload, EventRecord, EventView};
use crate::pagination::{Page, PageParams};
use crate::policy::{authorize, Action, Resource, EVENT_POLICIES};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::extract::{JsonBody, PathParams, QueryParams};
use crate::utils::response::{created, no_content, ok};

/// Upcoming events, soonest first, filtered and paginated.
pub async fn list_events(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    QueryParams(filter): QueryParams<EventFilter>,
    QueryParams(paging): QueryParams<PageParams>,
) -> AppResult<Response> {
    let page = paging.resolve()?;

    let category_id = match filter.category.as_deref() {
        Some(name) => {
            let category = db::categories::find_by_name(&state.pool, name)
                .await?
                .ok_or_else(|| {
                    AppError::field(
                        "category",
                        "Select a valid choice. That choice is not one of the available choices.",
                    )
                })?;
            Some(category.id)
        }
        None => None,
    };

    let (records, count) =
        db::events::list(&state.pool, &filter, category_id, Utc::now(), page).await?;
    page.ensure_within(count)?;

    Ok(ok(Page::new(records, count, page, &uri).map(EventView::from)))
}

pub async fn retrieve_event(
    State(state): State<AppState>,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Response> {
    let record = load_upcoming(&state, id).await?;
    Ok(ok(EventView::from(record)))
}

/// Any signed-in user may create events; the caller becomes the organizer
/// whatever the body says.
pub async fn create_event(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(payload): JsonBody<EventPayload>,
) -> AppResult<Response> {
    let actor = current.actor();
    let new_event = payload.into_new_event(Utc::now())?;
    ensure_category(&state, new_event.category).await?;

    let record = db::events::insert(&state.pool, actor.user_id, &new_event).await?;
    info!(event_id = %record.id, organizer_id = %actor.user_id, "Event created");
    Ok(created(EventView::from(record)))
}

pub async fn replace_event(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<EventPayload>,
) -> AppResult<Response> {
    update_event(state, current, id, payload, false).await
}

pub async fn patch_event(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(id): PathParams<Uuid>,
    JsonBody(payload): JsonBody<EventPayload>,
) -> AppResult<Response> {
    update_event(state, current, id, payload, true).await
}

async fn update_event(
    state: AppState,
    current: CurrentUser,
    id: Uuid,
    payload: EventPayload,
    partial: bool,
) -> AppResult<Response> {
    let record = load_for_organizer(&state, &current, id).await?;

    let now = Utc::now();
    let changes = payload.into_changes(partial, now)?;
    ensure_category(&state, changes.new_category()).await?;

    let updated = db::events::update(&state.pool, record.id, now, &changes).await?;
    info!(event_id = %updated.id, partial, "Event updated");
    Ok(ok(EventView::from(updated)))
}

pub async fn delete_event(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Response> {
    let record = load_for_organizer(&state, &current, id).await?;
    if !db::events::delete(&state.pool, record.id).await? {
        return Err(AppError::not_found());
    }

    info!(event_id = %record.id, "Event deleted");
    Ok(no_content())
}

/// Toggles the caller's attendance.
pub async fn register(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Response> {
    let actor = current.actor();
    let outcome =
        db::events::toggle_registration(&state.pool, id, actor.user_id, Utc::now()).await?;
    info!(
        event_id = %id,
        user_id = %actor.user_id,
        outcome = outcome.label(),
        "Registration toggled"
    );
    Ok(outcome.into_response())
}

/// Toggles the caller's place on the waitlist.
pub async fn waitlist_toggle(
    State(state): State<AppState>,
    current: CurrentUser,
    PathParams(id): PathParams<Uuid>,
) -> AppResult<Response> {
    let actor = current.actor();
    let outcome = db::events::toggle_waitlist(&state.pool, id, actor.user_id, Utc::now()).await?;
    info!(
        event_id = %id,
        user_id = %actor.user_id,
        outcome = outcome.label(),
        "Waitlist toggled"
    );
    Ok(outcome.into_response())
}

async fn load_upcoming(state: &AppState, id: Uuid) -> AppResult<EventRecord> {
    db::events::find_upcoming(&state.pool, id, Utc::now())
        .await?
        .ok_or_else(AppError::not_found)
}

async fn load_for_organizer(
    state: &AppState,
    current: &CurrentUser,
    id: Uuid,
) -> AppResult<EventRecord> {
    let record = load_upcoming(state, id).await?;
    authorize(
        EVENT_POLICIES,
        Some(&current.actor()),
        Action::Write,
        &Resource::Event {
            organizer_id: record.organizer_id,
        },
    )?;
    Ok(record)
}

async fn ensure_category(state: &AppState, category: Option<Uuid>) -> AppResult<()> {
    let Some(id) = category else {
        return Ok(());
    };
    match db::categories::find(&state.pool, id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::field(
            "category",
            format!("Invalid pk \"{id}\" - object does not exist."),
        )),
    }
}
