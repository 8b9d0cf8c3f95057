//! Field-level validation messages shared by every request payload.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::utils::error::AppError;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const DATETIME_FORMAT: &str =
    "Datetime has wrong format. Use one of these formats instead: YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";

/// Offset-less layouts, read as UTC.
const NAIVE_DATETIME_LAYOUTS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Messages keyed by the field that caused them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Key used for errors that do not belong to a single field.
    pub const NON_FIELD: &'static str = "non_field_errors";

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.0).unwrap_or(Value::Null)
    }

    /// `Ok(())` when nothing was collected, otherwise a validation error.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }

    /// Checks a required, non-blank string with a length ceiling and returns it trimmed.
    pub fn required_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        max_len: Option<usize>,
    ) -> Option<String> {
        match value {
            None => {
                self.add(field, REQUIRED);
                None
            }
            Some(v) => self.text(field, v, max_len),
        }
    }

    /// Same as [`FieldErrors::required_text`] for a value that is known to be present.
    pub fn text(&mut self, field: &str, value: &str, max_len: Option<usize>) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, BLANK);
            return None;
        }
        if let Some(max) = max_len {
            if trimmed.chars().count() > max {
                self.add(
                    field,
                    format!("Ensure this field has no more than {max} characters."),
                );
                return None;
            }
        }
        Some(trimmed.to_string())
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Distinguishes an absent field from an explicit `null`.
///
/// Used with `#[serde(default, deserialize_with = "present")]` on an
/// `Option<Option<T>>`: absent stays `None`, `null` becomes `Some(None)`.
pub fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parses an RFC 3339 timestamp, a datetime without offset or a bare date.
///
/// Values without an offset are taken as UTC; a bare date means midnight.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = raw.parse::<DateTime<Utc>>() {
        return Some(parsed);
    }
    if let Some(naive) = NAIVE_DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A datetime field from a request body.
///
/// Unparseable input is kept so it can be reported against its own field
/// instead of failing the whole body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateTimeInput {
    Valid(DateTime<Utc>),
    Invalid(String),
}

impl From<DateTime<Utc>> for DateTimeInput {
    fn from(value: DateTime<Utc>) -> Self {
        DateTimeInput::Valid(value)
    }
}

impl<'de> Deserialize<'de> for DateTimeInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let input = match Value::deserialize(deserializer)? {
            Value::String(raw) => match parse_datetime(&raw) {
                Some(parsed) => DateTimeInput::Valid(parsed),
                None => DateTimeInput::Invalid(raw),
            },
            other => DateTimeInput::Invalid(other.to_string()),
        };
        Ok(input)
    }
}
