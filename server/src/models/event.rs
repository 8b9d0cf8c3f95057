use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppResult;
use crate::validation::{present, DateTimeInput, FieldErrors, DATETIME_FORMAT, REQUIRED};

const TITLE_MAX_LEN: usize = 255;
const LOCATION_MAX_LEN: usize = 255;

/// An event row joined with its organizer name and membership sets.
#[derive(Debug, Clone, FromRow)]
pub struct EventRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date_and_time: DateTime<Utc>,
    pub location: String,
    pub capacity: i64,
    pub created_date: DateTime<Utc>,
    pub organizer_id: Uuid,
    pub organizer_username: String,
    pub category_id: Option<Uuid>,
    pub attendees: Vec<Uuid>,
    pub waitlist: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub date_and_time: DateTime<Utc>,
    pub location: String,
    pub capacity: i64,
    pub created_date: DateTime<Utc>,
    pub organizer: Uuid,
    pub organizer_username: String,
    pub attendees: Vec<Uuid>,
    pub waitlist: Vec<Uuid>,
    pub attendees_count: usize,
    pub category: Option<Uuid>,
}

impl From<EventRecord> for EventView {
    fn from(record: EventRecord) -> Self {
        Self {
            attendees_count: record.attendees.len(),
            id: record.id,
            title: record.title,
            description: record.description,
            date_and_time: record.date_and_time,
            location: record.location,
            capacity: record.capacity,
            created_date: record.created_date,
            organizer: record.organizer_id,
            organizer_username: record.organizer_username,
            attendees: record.attendees,
            waitlist: record.waitlist,
            category: record.category_id,
        }
    }
}

/// Writable event fields. Organizer, creation date and membership are not
/// part of it, so a client cannot set them.
#[derive(Debug, Default, Deserialize)]
pub struct EventPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_and_time: Option<DateTimeInput>,
    pub location: Option<String>,
    pub capacity: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub date_and_time: DateTime<Utc>,
    pub location: String,
    pub capacity: i64,
    pub category: Option<Uuid>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_and_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub capacity: Option<i64>,
    pub category: Option<Option<Uuid>>,
}

impl EventPayload {
    pub fn into_new_event(self, now: DateTime<Utc>) -> AppResult<NewEvent> {
        let changes = self.into_changes(false, now)?;
        match changes {
            EventChanges {
                title: Some(title),
                description: Some(description),
                date_and_time: Some(date_and_time),
                location: Some(location),
                capacity: Some(capacity),
                category,
            } => Ok(NewEvent {
                title,
                description,
                date_and_time,
                location,
                capacity,
                category: category.flatten(),
            }),
            _ => Err(crate::utils::error::AppError::InternalServerError(
                "validated event payload is incomplete".to_string(),
            )),
        }
    }

    /// Validates the supplied fields. Without `partial` the required fields must all be present.
    pub fn into_changes(self, partial: bool, now: DateTime<Utc>) -> AppResult<EventChanges> {
        let mut errors = FieldErrors::default();
        let require = |errors: &mut FieldErrors, field: &str, is_present: bool| {
            if !partial && !is_present {
                errors.add(field, REQUIRED);
            }
        };

        require(&mut errors, "title", self.title.is_some());
        require(&mut errors, "description", self.description.is_some());
        require(&mut errors, "date_and_time", self.date_and_time.is_some());
        require(&mut errors, "location", self.location.is_some());
        require(&mut errors, "capacity", self.capacity.is_some());

        let title = self
            .title
            .and_then(|v| errors.text("title", &v, Some(TITLE_MAX_LEN)));
        let description = self
            .description
            .and_then(|v| errors.text("description", &v, None));
        let location = self
            .location
            .and_then(|v| errors.text("location", &v, Some(LOCATION_MAX_LEN)));

        let date_and_time = match self.date_and_time {
            Some(DateTimeInput::Valid(when)) if when <= now => {
                errors.add("date_and_time", "Events must be in the future.");
                None
            }
            Some(DateTimeInput::Valid(when)) => Some(when),
            Some(DateTimeInput::Invalid(_)) => {
                errors.add("date_and_time", DATETIME_FORMAT);
                None
            }
            None => None,
        };
        if let Some(capacity) = self.capacity {
            if capacity < 1 {
                errors.add("capacity", "Ensure this value is greater than or equal to 1.");
            }
        }

        errors.into_result()?;
        Ok(EventChanges {
            title,
            description,
            date_and_time,
            location,
            capacity: self.capacity,
            category: self.category,
        })
    }
}

impl EventChanges {
    /// Capacity may not drop below the number of users already attending.
    pub fn check_capacity(&self, attendee_count: i64) -> AppResult<()> {
        match self.capacity {
            Some(capacity) if capacity < attendee_count => {
                let mut errors = FieldErrors::default();
                errors.add(
                    "capacity",
                    format!(
                        "Capacity cannot be lower than the current number of attendees ({attendee_count})."
                    ),
                );
                errors.into_result()
            }
            _ => Ok(()),
        }
    }

    /// The category this update points at, if it sets one.
    pub fn new_category(&self) -> Option<Uuid> {
        self.category.flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::AppError;
    use chrono::Duration;

    fn full_payload(now: DateTime<Utc>) -> EventPayload {
        EventPayload {
            title: Some("RustConf meetup".to_string()),
            description: Some("Talks and pizza".to_string()),
            date_and_time: Some((now + Duration::days(7)).into()),
            location: Some("Berlin".to_string()),
            capacity: Some(30),
            category: None,
        }
    }

    fn field_errors<T: std::fmt::Debug>(result: AppResult<T>) -> FieldErrors {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_from_full_payload() {
        let now = Utc::now();
        let event = full_payload(now).into_new_event(now).unwrap();
        assert_eq!(event.title, "RustConf meetup");
        assert_eq!(event.capacity, 30);
        assert_eq!(event.category, None);
    }

    #[test]
    fn test_past_date_is_rejected() {
        let now = Utc::now();
        let payload = EventPayload {
            date_and_time: Some((now - Duration::minutes(1)).into()),
            ..full_payload(now)
        };
        let errors = field_errors(payload.into_new_event(now));
        assert_eq!(errors.get("date_and_time").unwrap(), ["Events must be in the future."]);
    }

    #[test]
    fn test_current_instant_is_not_future() {
        let now = Utc::now();
        let payload = EventPayload {
            date_and_time: Some(now.into()),
            ..full_payload(now)
        };
        assert!(payload.into_new_event(now).is_err());
    }

    #[test]
    fn test_date_without_offset_is_accepted() {
        let now = Utc::now();
        let body = r#"{"title": "Jam", "description": "Bring instruments",
                       "date_and_time": "2999-06-01 18:30:00", "location": "Hall",
                       "capacity": 5}"#;
        let payload: EventPayload = serde_json::from_str(body).unwrap();
        let event = payload.into_new_event(now).unwrap();
        assert_eq!(event.date_and_time.to_rfc3339(), "2999-06-01T18:30:00+00:00");

        let payload: EventPayload =
            serde_json::from_str(r#"{"date_and_time": "2999-06-01"}"#).unwrap();
        let changes = payload.into_changes(true, now).unwrap();
        assert_eq!(
            changes.date_and_time.unwrap().to_rfc3339(),
            "2999-06-01T00:00:00+00:00"
        );
    }

    #[test]
    fn test_bad_date_is_a_field_error() {
        let payload: EventPayload =
            serde_json::from_str(r#"{"date_and_time": "next friday"}"#).unwrap();
        let errors = field_errors(payload.into_changes(true, Utc::now()));
        assert_eq!(errors.get("date_and_time").unwrap(), [DATETIME_FORMAT]);
    }

    #[test]
    fn test_capacity_must_be_positive() {
        let now = Utc::now();
        let payload = EventPayload {
            capacity: Some(0),
            ..full_payload(now)
        };
        let errors = field_errors(payload.into_new_event(now));
        assert!(errors.get("capacity").is_some());
    }

    #[test]
    fn test_full_update_requires_fields() {
        let now = Utc::now();
        let errors = field_errors(EventPayload::default().into_changes(false, now));
        for field in ["title", "description", "date_and_time", "location", "capacity"] {
            assert_eq!(errors.get(field).unwrap(), [REQUIRED], "{field}");
        }
        assert!(errors.get("category").is_none());
    }

    #[test]
    fn test_partial_update_only_validates_supplied_fields() {
        let now = Utc::now();
        let changes = EventPayload {
            location: Some(" Lisbon ".to_string()),
            ..Default::default()
        }
        .into_changes(true, now)
        .unwrap();
        assert_eq!(changes.location.as_deref(), Some("Lisbon"));
        assert_eq!(changes.title, None);
        assert_eq!(changes.category, None);
    }

    #[test]
    fn test_organizer_in_body_is_ignored() {
        let body = r#"{"title": "Jam", "organizer": "00000000-0000-0000-0000-000000000001",
                       "attendees": ["00000000-0000-0000-0000-000000000002"], "category": null}"#;
        let payload: EventPayload = serde_json::from_str(body).unwrap();
        let changes = payload.into_changes(true, Utc::now()).unwrap();
        assert_eq!(changes.title.as_deref(), Some("Jam"));
        assert_eq!(changes.category, Some(None));
    }

    #[test]
    fn test_capacity_cannot_drop_below_attendees() {
        let changes = EventChanges {
            capacity: Some(2),
            ..Default::default()
        };
        assert!(changes.check_capacity(2).is_ok());
        let errors = field_errors(changes.check_capacity(3));
        assert!(errors.get("capacity").is_some());
        assert!(EventChanges::default().check_capacity(100).is_ok());
    }

    #[test]
    fn test_view_counts_attendees() {
        let now = Utc::now();
        let record = EventRecord {
            id: Uuid::new_v4(),
            title: "Jam".to_string(),
            description: "Bring instruments".to_string(),
            date_and_time: now,
            location: "Hall".to_string(),
            capacity: 5,
            created_date: now,
            organizer_id: Uuid::new_v4(),
            organizer_username: "ada".to_string(),
            category_id: None,
            attendees: vec![Uuid::new_v4(), Uuid::new_v4()],
            waitlist: vec![],
        };
        let view = EventView::from(record);
        assert_eq!(view.attendees_count, 2);
        assert_eq!(serde_json::to_value(&view).unwrap()["organizer_username"], "ada");
    }
}
