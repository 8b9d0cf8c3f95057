use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CommentChanges, CommentRecord, NewComment};
use crate::pagination::PageRequest;

const SELECT_COMMENT: &str = "SELECT c.id, c.event_id, c.user_id, u.username, c.content,
        c.rating, c.created_at
    FROM comments c
    JOIN users u ON u.id = c.user_id";

/// Comments on `event_id`, oldest first. An unknown event simply has none.
pub async fn list_for_event(
    pool: &PgPool,
    event_id: Uuid,
    page: PageRequest,
) -> sqlx::Result<(Vec<CommentRecord>, i64)> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await?;
    let comments = sqlx::query_as::<_, CommentRecord>(&format!(
        "{SELECT_COMMENT} WHERE c.event_id = $1 ORDER BY c.created_at, c.id LIMIT $2 OFFSET $3"
    ))
    .bind(event_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok((comments, count))
}

pub async fn find(pool: &PgPool, event_id: Uuid, id: Uuid) -> sqlx::Result<Option<CommentRecord>> {
    sqlx::query_as::<_, CommentRecord>(&format!(
        "{SELECT_COMMENT} WHERE c.event_id = $1 AND c.id = $2"
    ))
    .bind(event_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn insert(
    pool: &PgPool,
    event_id: Uuid,
    user_id: Uuid,
    comment: &NewComment,
) -> sqlx::Result<CommentRecord> {
    sqlx::query_as::<_, CommentRecord>(
        "WITH inserted AS (
            INSERT INTO comments (id, event_id, user_id, content, rating)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
         )
         SELECT c.id, c.event_id, c.user_id, u.username, c.content, c.rating, c.created_at
         FROM inserted c
         JOIN users u ON u.id = c.user_id",
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(user_id)
    .bind(&comment.content)
    .bind(comment.rating)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: &CommentChanges,
) -> sqlx::Result<Option<CommentRecord>> {
    sqlx::query_as::<_, CommentRecord>(
        "WITH updated AS (
            UPDATE comments
            SET content = COALESCE($2, content),
                rating = CASE WHEN $3 THEN $4 ELSE rating END
            WHERE id = $1
            RETURNING *
         )
         SELECT c.id, c.event_id, c.user_id, u.username, c.content, c.rating, c.created_at
         FROM updated c
         JOIN users u ON u.id = c.user_id",
    )
    .bind(id)
    .bind(changes.content.as_deref())
    .bind(changes.rating.is_some())
    .bind(changes.rating.flatten())
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}
