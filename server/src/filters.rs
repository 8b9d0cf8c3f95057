//! Query-string filters for the event list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::validation::parse_datetime;

/// All filters are optional and combine with AND. Empty values are ignored.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EventFilter {
    #[serde(default, deserialize_with = "non_empty")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "non_empty_datetime")]
    pub date_range_start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "non_empty_datetime")]
    pub date_range_end: Option<DateTime<Utc>>,
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

fn non_empty_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match non_empty(deserializer)? {
        None => Ok(None),
        Some(raw) => parse_datetime(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("Enter a valid date/time: '{raw}'."))),
    }
}

/// Escapes `LIKE` wildcards so user input only ever matches literally.
pub fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl EventFilter {
    /// Appends the filter conditions to a query whose `WHERE` clause is already open.
    ///
    /// `category_id` is the id resolved from the `category` name by the caller.
    pub fn push_conditions(&self, q: &mut QueryBuilder<'_, Postgres>, category_id: Option<Uuid>) {
        if let Some(title) = &self.title {
            q.push(" AND e.title ILIKE ").push_bind(like_pattern(title));
        }
        if let Some(location) = &self.location {
            q.push(" AND e.location ILIKE ")
                .push_bind(like_pattern(location));
        }
        if let Some(category_id) = category_id {
            q.push(" AND e.category_id = ").push_bind(category_id);
        }
        if let Some(start) = self.date_range_start {
            q.push(" AND e.date_and_time >= ").push_bind(start);
        }
        if let Some(end) = self.date_range_end {
            q.push(" AND e.date_and_time <= ").push_bind(end);
        }
    }
}
