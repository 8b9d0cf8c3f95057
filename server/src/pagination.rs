//! Page-number pagination with a `count/next/previous/results` envelope.

use axum::http::Uri;
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw `page` / `page_size` query parameters.
///
/// Kept as strings so a malformed page is reported as an invalid page and a
/// malformed size falls back to the default instead of failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

fn invalid_page() -> AppError {
    AppError::NotFound("Invalid page.".to_string())
}

impl PageParams {
    pub fn resolve(&self) -> AppResult<PageRequest> {
        let page = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => raw.parse::<i64>().map_err(|_| invalid_page())?,
        };
        if page < 1 {
            return Err(invalid_page());
        }

        let size = self
            .page_size
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|size| *size > 0)
            .map_or(DEFAULT_PAGE_SIZE, |size| size.min(MAX_PAGE_SIZE));

        Ok(PageRequest { page, size })
    }
}

impl PageRequest {
    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.size)
    }

    /// Page 1 always exists; any later page must start inside the result set.
    pub fn ensure_within(&self, count: i64) -> AppResult<()> {
        if self.page > 1 && self.offset() >= count {
            Err(invalid_page())
        } else {
            Ok(())
        }
    }
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, request: PageRequest, uri: &Uri) -> Self {
        let has_next = request.offset() + (results.len() as i64) < count;
        let next = has_next.then(|| page_link(uri, Some(request.page + 1)));
        let previous = match request.page {
            1 => None,
            2 => Some(page_link(uri, None)),
            page => Some(page_link(uri, Some(page - 1))),
        };

        Self {
            count,
            next,
            previous,
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// The request path with its query string, `page` replaced (or dropped for the first page).
fn page_link(uri: &Uri, page: Option<i64>) -> String {
    let mut pairs: Vec<(String, String)> = uri
        .query()
        .and_then(|query| serde_urlencoded::from_str(query).ok())
        .unwrap_or_default();
    pairs.retain(|(key, _)| key != "page");
    if let Some(page) = page {
        pairs.push(("page".to_string(), page.to_string()));
    }

    let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
    if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    }
}
