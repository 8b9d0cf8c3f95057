use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Category;
use crate::pagination::PageRequest;
use crate::utils::error::{is_unique_violation, AppError, AppResult};

pub async fn list(pool: &PgPool, page: PageRequest) -> sqlx::Result<(Vec<Category>, i64)> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;
    let categories = sqlx::query_as::<_, Category>(
        "SELECT id, name FROM categories ORDER BY name, id LIMIT $1 OFFSET $2",
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok((categories, count))
}

pub async fn find(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<Category>> {
    sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_name(pool: &PgPool, name: &str) -> sqlx::Result<Option<Category>> {
    sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await
}

pub async fn insert(pool: &PgPool, name: &str) -> AppResult<Category> {
    sqlx::query_as::<_, Category>("INSERT INTO categories (id, name) VALUES ($1, $2) RETURNING id, name")
        .bind(Uuid::new_v4())
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::field("name", "category with this name already exists.")
            } else {
                AppError::from(err)
            }
        })
}

/// Deletes the category; referencing events keep existing with no category.
pub async fn delete(pool: &PgPool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}
