use sqlx::PgPool;
use uuid::Uuid;

use crate::models::User;
use crate::utils::error::{is_unique_violation, AppError, AppResult};

const USERNAME_TAKEN: &str = "A user with that username already exists.";

fn map_unique(err: sqlx::Error) -> AppError {
    if is_unique_violation(&err) {
        AppError::field("username", USERNAME_TAKEN)
    } else {
        AppError::from(err)
    }
}

pub async fn insert(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> AppResult<User> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, username, email, password_hash)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(map_unique)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// Overwrites the given columns; `None` keeps the stored value.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    username: Option<&str>,
    email: Option<&str>,
    password_hash: Option<&str>,
) -> AppResult<Option<User>> {
    sqlx::query_as::<_, User>(
        "UPDATE users
         SET username = COALESCE($2, username),
             email = COALESCE($3, email),
             password_hash = COALESCE($4, password_hash)
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_optional(pool)
    .await
    .map_err(map_unique)
}

/// Removes the account. Organised events, comments, memberships and sessions cascade.
pub async fn delete(pool: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}
