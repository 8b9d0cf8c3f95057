use axum::response::Response;
use serde::Serialize;

use crate::utils::error::AppError;
use crate::utils::response::ok;

pub mod accounts;
pub mod categories;
pub mod comments;
pub mod events;
pub mod users;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    ok(HealthPayload {
        status: "ok",
        service: "convene-api",
    })
}

pub async fn not_found() -> AppError {
    AppError::not_found()
}
