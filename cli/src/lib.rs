//! Presentation layer for the reminders client: the `reminders` command line
//! and the small web form served by `reminders serve`.
//!
//! Both build a fresh `RemindersClient` per operation from the shared
//! configuration and credential provider, and both render reminders with
//! `render_listing`.

pub mod web;

use reminders_core::{ListEntry, Reminder};

/// One display line per decodable reminder, earliest due first.
///
/// Entries the codec could not decode were already logged and are left out.
pub fn render_listing(entries: Vec<ListEntry>) -> String {
    let mut reminders: Vec<Reminder> = entries.into_iter().flatten().collect();
    reminders.sort();
    reminders.iter().map(|r| format!("{r}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use reminders_core::ApiError;

    fn reminder(id: &str, day: u32) -> Reminder {
        let due = NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Reminder::new(id, format!("title {id}"), due).unwrap()
    }

    #[test]
    fn listing_is_sorted_by_due() {
        let entries = vec![Ok(reminder("late", 2)), Ok(reminder("early", 1))];
        assert_eq!(
            render_listing(entries),
            "2024-01-01 08:00: title early ; id=\"early\"\n\
             2024-01-02 08:00: title late ; id=\"late\"\n"
        );
    }

    #[test]
    fn listing_skips_malformed_entries() {
        let entries = vec![
            Err(ApiError::MalformedReminder("missing title".into())),
            Ok(reminder("only", 3)),
        ];
        assert_eq!(render_listing(entries).lines().count(), 1);
    }

    #[test]
    fn empty_listing_is_empty_string() {
        assert_eq!(render_listing(Vec::new()), "");
    }
}
