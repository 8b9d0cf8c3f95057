//! PostgreSQL access. Every query is checked at runtime so the crate builds without a database.

pub mod categories;
pub mod comments;
pub mod events;
pub mod sessions;
pub mod users;
