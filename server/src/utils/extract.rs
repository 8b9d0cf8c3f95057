//! Extractors whose rejections are reported through [`AppError`].

use axum::extract::{FromRequest, FromRequestParts};

use crate::utils::error::AppError;

/// JSON body; malformed input becomes a validation error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Query string; malformed parameters become a validation error.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// Path parameters; an id that cannot be parsed can never match a row, so it is a 404.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct PathParams<T>(pub T);
