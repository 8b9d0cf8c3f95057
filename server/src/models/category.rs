use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppResult;
use crate::validation::FieldErrors;

const NAME_MAX_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryPayload {
    pub name: Option<String>,
}

impl CategoryPayload {
    /// Returns the trimmed category name.
    pub fn into_name(self) -> AppResult<String> {
        let mut errors = FieldErrors::default();
        let name = errors.required_text("name", self.name.as_deref(), Some(NAME_MAX_LEN));
        errors.into_result()?;
        Ok(name.unwrap_or_default())
    }
}
