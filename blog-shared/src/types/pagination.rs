use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::{AppError, ErrorCode};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

/// Query string for cursor-paginated listings.
///
/// Both fields are taken as raw strings so a malformed value produces the
/// regular error envelope instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CursorParams {
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

impl CursorParams {
    /// Page size: unparsable or non-positive values fall back to the default,
    /// anything above the cap is clamped.
    pub fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE)
    }

    /// Rows are fetched strictly older than the cursor.
    pub fn cursor(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        match self.cursor.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|_| AppError::new(ErrorCode::ValidationError, "invalid cursor")),
        }
    }

    /// Number of rows to ask the database for: one extra to detect a next page.
    pub fn fetch_limit(&self) -> i64 {
        self.limit() + 1
    }
}

/// One page of rows plus the cursor of the next one. Handlers rename
/// `items` to the resource's plural before serializing.
#[derive(Debug)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<DateTime<Utc>>,
}

impl<T> CursorPage<T> {
    /// Build a page from rows fetched with [`CursorParams::fetch_limit`],
    /// ordered newest first. `created_at` extracts the sort key.
    pub fn from_overfetch(
        mut rows: Vec<T>,
        limit: i64,
        created_at: impl Fn(&T) -> DateTime<Utc>,
    ) -> Self {
        let limit = limit.max(0) as usize;
        let next_cursor = if rows.len() > limit {
            rows.truncate(limit);
            rows.last().map(&created_at)
        } else {
            None
        };
        Self { items: rows, next_cursor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn params(limit: Option<&str>, cursor: Option<&str>) -> CursorParams {
        CursorParams {
            limit: limit.map(String::from),
            cursor: cursor.map(String::from),
        }
    }

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(params(None, None).limit(), 10);
        assert_eq!(params(Some("0"), None).limit(), 10);
        assert_eq!(params(Some("-3"), None).limit(), 10);
        assert_eq!(params(Some("abc"), None).limit(), 10);
        assert_eq!(params(Some("7"), None).limit(), 7);
        assert_eq!(params(Some("500"), None).limit(), 50);
        assert_eq!(params(Some("500"), None).fetch_limit(), 51);
    }

    #[test]
    fn cursor_parses_rfc3339() {
        let c = params(None, Some("2026-03-01T10:00:00Z")).cursor().unwrap().unwrap();
        assert_eq!(c.to_rfc3339(), "2026-03-01T10:00:00+00:00");
        assert!(params(None, Some("")).cursor().unwrap().is_none());
        assert!(params(None, Some("yesterday")).cursor().is_err());
    }

    fn rows(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc::now();
        (0..n).map(|i| base - Duration::minutes(i as i64)).collect()
    }

    #[test]
    fn cursor_only_when_more_rows_exist() {
        // fetched limit + 1 rows: there is a next page
        let fetched = rows(4);
        let expected_cursor = fetched[2];
        let page = CursorPage::from_overfetch(fetched, 3, |r| *r);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.next_cursor, Some(expected_cursor));

        // exactly limit rows: last page
        let page = CursorPage::from_overfetch(rows(3), 3, |r| *r);
        assert_eq!(page.items.len(), 3);
        assert!(page.next_cursor.is_none());

        let page = CursorPage::from_overfetch(Vec::<DateTime<Utc>>::new(), 3, |r| *r);
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }
}
