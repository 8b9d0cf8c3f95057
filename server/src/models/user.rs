use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::error::AppResult;
use crate::validation::{FieldErrors, BLANK, REQUIRED};

const USERNAME_MAX_LEN: usize = 150;
const EMAIL_MAX_LEN: usize = 254;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
}

/// Public representation; the password hash never leaves the server.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Body accepted by registration and by account updates.
#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Fields to overwrite on an existing account; `None` keeps the stored value.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserPayload {
    pub fn into_new_user(self) -> AppResult<NewUser> {
        let changes = self.into_changes(false)?;
        match changes {
            UserChanges {
                username: Some(username),
                email: Some(email),
                password: Some(password),
            } => Ok(NewUser {
                username,
                email,
                password,
            }),
            _ => Err(crate::utils::error::AppError::InternalServerError(
                "validated user payload is incomplete".to_string(),
            )),
        }
    }

    /// Validates the payload. With `partial` unset every field is required (PUT semantics).
    pub fn into_changes(self, partial: bool) -> AppResult<UserChanges> {
        let mut errors = FieldErrors::default();

        let username = match self.username {
            Some(v) => validate_username(&mut errors, &v),
            None => missing(&mut errors, "username", partial),
        };
        let email = match self.email {
            Some(v) => validate_email(&mut errors, &v),
            None => missing(&mut errors, "email", partial),
        };
        let password = match self.password {
            Some(v) if v.trim().is_empty() => {
                errors.add("password", BLANK);
                None
            }
            Some(v) => Some(v),
            None => missing(&mut errors, "password", partial),
        };

        errors.into_result()?;
        Ok(UserChanges {
            username,
            email,
            password,
        })
    }
}

fn missing(errors: &mut FieldErrors, field: &str, partial: bool) -> Option<String> {
    if !partial {
        errors.add(field, REQUIRED);
    }
    None
}

fn validate_username(errors: &mut FieldErrors, value: &str) -> Option<String> {
    let username = errors.text("username", value, Some(USERNAME_MAX_LEN))?;
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
        return None;
    }
    Some(username)
}

fn validate_email(errors: &mut FieldErrors, value: &str) -> Option<String> {
    let email = errors.text("email", value, Some(EMAIL_MAX_LEN))?;
    if !is_valid_email(&email) {
        errors.add("email", "Enter a valid email address.");
        return None;
    }
    Some(email)
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
