//! Free-text time expressions ("tomorrow 8am", "next friday 18:00").

use chrono::{DateTime, Local, NaiveDateTime};
use chrono_english::{parse_date_string, Dialect};

use crate::error::ApiError;

/// Resolve `text` against `now` into a naive local date-time.
///
/// Parsing is delegated to `chrono-english` with US conventions.
pub fn parse_time_expression(text: &str, now: DateTime<Local>) -> Result<NaiveDateTime, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ApiError::UnparsableTime(String::new()));
    }
    parse_date_string(text, now, Dialect::Us)
        .map(|dt| dt.naive_local())
        .map_err(|e| {
            tracing::debug!("cannot parse {text:?}: {e}");
            ApiError::UnparsableTime(text.to_string())
        })
}
