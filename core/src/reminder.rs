//! The reminder value type.
//!
//! # Design
//! `Reminder` is immutable once built: fields are private and the `with_*`
//! methods consume the value and hand back a new one. The id is the only
//! field the service cannot live without, so it is validated up front and a
//! reminder without one never reaches the codec.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;

use crate::error::ApiError;

/// U+0336 COMBINING LONG STROKE OVERLAY.
const STRIKETHROUGH: char = '\u{0336}';

/// A single reminder as known to the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reminder {
    id: String,
    title: String,
    due: NaiveDateTime,
    creation_timestamp_millis: Option<i64>,
    done: bool,
}

impl Reminder {
    /// Build a reminder that has not been sent to the service yet.
    ///
    /// Fails with `ApiError::InvalidReminder` if `id` is empty.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        due: NaiveDateTime,
    ) -> Result<Self, ApiError> {
        Self::from_parts(Some(id.into()), title.into(), due, None, false)
    }

    /// Build a reminder from possibly-missing parts, as the codec sees them.
    pub fn from_parts(
        id: Option<String>,
        title: String,
        due: NaiveDateTime,
        creation_timestamp_millis: Option<i64>,
        done: bool,
    ) -> Result<Self, ApiError> {
        let id = match id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Err(ApiError::InvalidReminder("reminder id must not be empty".into())),
        };
        Ok(Self {
            id,
            title,
            due,
            creation_timestamp_millis,
            done,
        })
    }

    pub fn with_creation_timestamp_millis(mut self, millis: i64) -> Self {
        self.creation_timestamp_millis = Some(millis);
        self
    }

    pub fn with_done(mut self, done: bool) -> Self {
        self.done = done;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn due(&self) -> NaiveDateTime {
        self.due
    }

    pub fn creation_timestamp_millis(&self) -> Option<i64> {
        self.creation_timestamp_millis
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The title as shown to users: unchanged while pending, struck through
    /// character by character once done.
    ///
    /// The combining mark follows every character, the last one included,
    /// rather than only sitting between characters.
    pub fn display_title(&self) -> Cow<'_, str> {
        if !self.done {
            return Cow::Borrowed(&self.title);
        }
        let mut struck = String::with_capacity(self.title.len() * 3);
        for c in self.title.chars() {
            struck.push(c);
            struck.push(STRIKETHROUGH);
        }
        Cow::Owned(struck)
    }
}

/// Reminders sort by due date. Remaining fields only break ties so that
/// `Ord` agrees with `Eq`.
impl Ord for Reminder {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.id.cmp(&other.id))
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.creation_timestamp_millis.cmp(&other.creation_timestamp_millis))
            .then_with(|| self.done.cmp(&other.done))
    }
}

impl PartialOrd for Reminder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ; id=\"{}\"",
            self.due.format("%Y-%m-%d %H:%M"),
            self.display_title(),
            self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn new_reminder_defaults() {
        let r = Reminder::new("abc", "Buy milk", at(2024, 1, 1, 9, 0)).unwrap();
        assert_eq!(r.id(), "abc");
        assert_eq!(r.title(), "Buy milk");
        assert!(r.creation_timestamp_millis().is_none());
        assert!(!r.is_done());
    }

    #[test]
    fn empty_id_is_rejected() {
        let err = Reminder::new("", "x", at(2024, 1, 1, 9, 0)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidReminder(_)));

        let err = Reminder::new("   ", "x", at(2024, 1, 1, 9, 0)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidReminder(_)));
    }

    #[test]
    fn missing_id_is_rejected() {
        let err = Reminder::from_parts(None, "x".into(), at(2024, 1, 1, 9, 0), None, false)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidReminder(_)));
    }

    #[test]
    fn display_pending_reminder() {
        let r = Reminder::new("cli-reminder-1", "Call mom", at(2024, 3, 5, 8, 30)).unwrap();
        assert_eq!(r.to_string(), "2024-03-05 08:30: Call mom ; id=\"cli-reminder-1\"");
    }

    #[test]
    fn done_title_strikes_every_character() {
        let r = Reminder::new("x", "abc", at(2024, 1, 1, 0, 0)).unwrap().with_done(true);
        assert_eq!(r.display_title(), "a\u{336}b\u{336}c\u{336}");
        assert_eq!(
            r.display_title().chars().filter(|&c| c == STRIKETHROUGH).count(),
            r.title().chars().count()
        );
    }

    #[test]
    fn pending_title_is_unchanged() {
        let r = Reminder::new("x", "abc", at(2024, 1, 1, 0, 0)).unwrap();
        assert!(matches!(r.display_title(), Cow::Borrowed("abc")));
    }

    #[test]
    fn sorts_by_due_ascending() {
        let later = Reminder::new("a", "later", at(2024, 1, 2, 0, 0)).unwrap();
        let earlier = Reminder::new("b", "earlier", at(2024, 1, 1, 0, 0)).unwrap();
        let mut reminders = vec![later, earlier];
        reminders.sort();
        assert_eq!(reminders[0].title(), "earlier");
        assert_eq!(reminders[1].title(), "later");
    }

    #[test]
    fn with_methods_return_new_values() {
        let r = Reminder::new("x", "t", at(2024, 1, 1, 0, 0)).unwrap();
        let created = r.clone().with_creation_timestamp_millis(1_700_000_000_000);
        assert_eq!(created.creation_timestamp_millis(), Some(1_700_000_000_000));
        assert!(r.creation_timestamp_millis().is_none());
    }
}
