pub mod admin_users;
pub mod auth;
pub mod blogs;
pub mod health;
pub mod public_blogs;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::ValidationErrors;

use blog_shared::types::pagination::CursorPage;
use blog_shared::{AppError, AppResult, ErrorCode};

/// Path ids are taken as strings so a malformed one gets the error envelope.
pub(crate) fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::new(ErrorCode::ValidationError, "invalid id"))
}

/// First custom message of a failed `validate()`, as a 400.
pub(crate) fn validation_error(errors: ValidationErrors) -> AppError {
    let message = errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string());
    AppError::new(ErrorCode::ValidationError, message)
}

/// `{ "blog": ... }`
#[derive(Debug, Serialize)]
pub struct BlogBody<T> {
    pub blog: T,
}

/// `{ "nextCursor": ..., "blogs": [...] }`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPage<T> {
    pub next_cursor: Option<DateTime<Utc>>,
    pub blogs: Vec<T>,
}

impl<T> From<CursorPage<T>> for BlogPage<T> {
    fn from(page: CursorPage<T>) -> Self {
        Self {
            next_cursor: page.next_cursor,
            blogs: page.items,
        }
    }
}
