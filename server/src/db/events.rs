use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::filters::EventFilter;
use crate::models::{EventChanges, EventRecord, NewEvent};
use crate::pagination::PageRequest;
use crate::registration::{
    decide_register, decide_waitlist, Membership, RegisterOutcome, WaitlistOutcome,
};
use crate::utils::error::{AppError, AppResult};

/// Selects [`EventRecord`] columns; callers append `WHERE`.
const SELECT_EVENT: &str = "SELECT e.id, e.title, e.description, e.date_and_time, e.location,
        e.capacity, e.created_date, e.organizer_id, u.username AS organizer_username,
        e.category_id,
        ARRAY(SELECT a.user_id FROM event_attendees a
              WHERE a.event_id = e.id ORDER BY a.joined_at, a.user_id) AS attendees,
        ARRAY(SELECT w.user_id FROM event_waitlist w
              WHERE w.event_id = e.id ORDER BY w.joined_at, w.user_id) AS waitlist
    FROM events e
    JOIN users u ON u.id = e.organizer_id";

/// Upcoming events matching `filter`, soonest first.
pub async fn list(
    pool: &PgPool,
    filter: &EventFilter,
    category_id: Option<Uuid>,
    now: DateTime<Utc>,
    page: PageRequest,
) -> sqlx::Result<(Vec<EventRecord>, i64)> {
    let mut count_query = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FROM events e WHERE e.date_and_time >= ",
    );
    count_query.push_bind(now);
    filter.push_conditions(&mut count_query, category_id);
    let count = count_query.build_query_scalar::<i64>().fetch_one(pool).await?;

    let mut q = QueryBuilder::<Postgres>::new(SELECT_EVENT);
    q.push(" WHERE e.date_and_time >= ").push_bind(now);
    filter.push_conditions(&mut q, category_id);
    q.push(" ORDER BY e.date_and_time, e.id LIMIT ")
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let events = q.build_query_as::<EventRecord>().fetch_all(pool).await?;

    Ok((events, count))
}

async fn find_record<'e, E>(executor: E, id: Uuid) -> sqlx::Result<Option<EventRecord>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, EventRecord>(&format!("{SELECT_EVENT} WHERE e.id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// An event that has not started yet. Past events are invisible to detail operations.
pub async fn find_upcoming(
    pool: &PgPool,
    id: Uuid,
    now: DateTime<Utc>,
) -> sqlx::Result<Option<EventRecord>> {
    sqlx::query_as::<_, EventRecord>(&format!(
        "{SELECT_EVENT} WHERE e.id = $1 AND e.date_and_time >= $2"
    ))
    .bind(id)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn exists(pool: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn insert(pool: &PgPool, organizer_id: Uuid, event: &NewEvent) -> AppResult<EventRecord> {
    let id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO events
            (id, title, description, date_and_time, location, capacity, organizer_id, category_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(id)
    .bind(&event.title)
    .bind(&event.description)
    .bind(event.date_and_time)
    .bind(&event.location)
    .bind(event.capacity)
    .bind(organizer_id)
    .bind(event.category)
    .execute(&mut *tx)
    .await?;

    let record = find_record(&mut *tx, id).await?;
    tx.commit().await?;
    record.ok_or_else(|| AppError::InternalServerError("inserted event vanished".to_string()))
}

/// Applies `changes` under the event row lock so the capacity check sees a
/// stable attendee count.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    now: DateTime<Utc>,
    changes: &EventChanges,
) -> AppResult<EventRecord> {
    let mut tx = pool.begin().await?;

    lock_upcoming(&mut tx, id, now).await?;
    let attendee_count = count_attendees(&mut tx, id).await?;
    changes.check_capacity(attendee_count)?;

    sqlx::query(
        "UPDATE events
         SET title = COALESCE($2, title),
             description = COALESCE($3, description),
             date_and_time = COALESCE($4, date_and_time),
             location = COALESCE($5, location),
             capacity = COALESCE($6, capacity),
             category_id = CASE WHEN $7 THEN $8 ELSE category_id END
         WHERE id = $1",
    )
    .bind(id)
    .bind(changes.title.as_deref())
    .bind(changes.description.as_deref())
    .bind(changes.date_and_time)
    .bind(changes.location.as_deref())
    .bind(changes.capacity)
    .bind(changes.category.is_some())
    .bind(changes.new_category())
    .execute(&mut *tx)
    .await?;

    let record = find_record(&mut *tx, id).await?;
    tx.commit().await?;
    record.ok_or_else(AppError::not_found)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Takes the row lock on an upcoming event and returns its capacity.
///
/// Anything counted while the lock is held must be read by a later
/// statement: under READ COMMITTED a statement keeps the snapshot it started
/// with, even when it had to wait for the lock.
async fn lock_upcoming(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<i64> {
    let capacity: Option<i64> = sqlx::query_scalar(
        "SELECT capacity FROM events WHERE id = $1 AND date_and_time >= $2 FOR UPDATE",
    )
    .bind(event_id)
    .bind(now)
    .fetch_optional(&mut **tx)
    .await?;
    capacity.ok_or_else(AppError::not_found)
}

async fn count_attendees(tx: &mut Transaction<'_, Postgres>, event_id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM event_attendees WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await
}

/// Locks the event row and reads `user_id`'s standing on it.
async fn lock_membership(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Membership> {
    let capacity = lock_upcoming(tx, event_id, now).await?;

    let (attending, waitlisted, attendee_count): (bool, bool, i64) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM event_attendees WHERE event_id = $1 AND user_id = $2),
                EXISTS(SELECT 1 FROM event_waitlist WHERE event_id = $1 AND user_id = $2),
                (SELECT COUNT(*) FROM event_attendees WHERE event_id = $1)",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(Membership {
        attending,
        waitlisted,
        attendee_count,
        capacity,
    })
}

/// Toggles attendance of `user_id` on the event in one transaction.
pub async fn toggle_registration(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<RegisterOutcome> {
    let mut tx = pool.begin().await?;
    let membership = lock_membership(&mut tx, event_id, user_id, now).await?;
    let outcome = decide_register(membership);

    match outcome {
        RegisterOutcome::Unregistered => {
            sqlx::query("DELETE FROM event_attendees WHERE event_id = $1 AND user_id = $2")
                .bind(event_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        RegisterOutcome::Registered { left_waitlist } => {
            sqlx::query("INSERT INTO event_attendees (event_id, user_id) VALUES ($1, $2)")
                .bind(event_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            if left_waitlist {
                sqlx::query("DELETE FROM event_waitlist WHERE event_id = $1 AND user_id = $2")
                    .bind(event_id)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        RegisterOutcome::Full => {}
    }

    tx.commit().await?;
    Ok(outcome)
}

/// Toggles waitlist membership of `user_id` on the event in one transaction.
pub async fn toggle_waitlist(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<WaitlistOutcome> {
    let mut tx = pool.begin().await?;
    let membership = lock_membership(&mut tx, event_id, user_id, now).await?;
    let outcome = decide_waitlist(membership);

    match outcome {
        WaitlistOutcome::Added => {
            sqlx::query("INSERT INTO event_waitlist (event_id, user_id) VALUES ($1, $2)")
                .bind(event_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        WaitlistOutcome::Removed => {
            sqlx::query("DELETE FROM event_waitlist WHERE event_id = $1 AND user_id = $2")
                .bind(event_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }
        WaitlistOutcome::AlreadyRegistered => {}
    }

    tx.commit().await?;
    Ok(outcome)
}
