use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppResult;
use crate::validation::{present, FieldErrors, REQUIRED};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// A comment row joined with its author's username.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub content: String,
    pub rating: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub event: Uuid,
    pub user: Uuid,
    pub username: String,
    pub content: String,
    pub rating: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<CommentRecord> for CommentView {
    fn from(record: CommentRecord) -> Self {
        Self {
            id: record.id,
            event: record.event_id,
            user: record.user_id,
            username: record.username,
            content: record.content,
            rating: record.rating,
            created_at: record.created_at,
        }
    }
}

/// Writable comment fields; the event comes from the path and the author from the session.
#[derive(Debug, Default, Deserialize)]
pub struct CommentPayload {
    pub content: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub rating: Option<Option<i64>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub content: String,
    pub rating: Option<i32>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommentChanges {
    pub content: Option<String>,
    pub rating: Option<Option<i32>>,
}

impl CommentPayload {
    pub fn into_new_comment(self) -> AppResult<NewComment> {
        let changes = self.into_changes(false)?;
        Ok(NewComment {
            content: changes.content.unwrap_or_default(),
            rating: changes.rating.flatten(),
        })
    }

    pub fn into_changes(self, partial: bool) -> AppResult<CommentChanges> {
        let mut errors = FieldErrors::default();

        let content = match self.content {
            Some(v) => errors.text("content", &v, None),
            None => {
                if !partial {
                    errors.add("content", REQUIRED);
                }
                None
            }
        };

        let rating = match self.rating {
            Some(Some(value)) => match validate_rating(value) {
                Some(rating) => Some(Some(rating)),
                None => {
                    errors.add(
                        "rating",
                        format!("Ensure this value is between {MIN_RATING} and {MAX_RATING}."),
                    );
                    None
                }
            },
            other => other.map(|_| None),
        };

        errors.into_result()?;
        Ok(CommentChanges { content, rating })
    }
}

fn validate_rating(value: i64) -> Option<i32> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        i32::try_from(value).ok()
    } else {
        None
    }
}
