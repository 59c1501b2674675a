//! The one-shot "remind me" operation used by the CLI and the web form.

use chrono::{DateTime, Local, Utc};

use crate::client::RemindersClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::reminder::Reminder;
use crate::time::parse_time_expression;

const ID_PREFIX: &str = "cli-reminder-";

/// A fresh reminder id derived from the current Unix time.
pub fn generate_id() -> String {
    id_for_time(Utc::now())
}

/// `cli-reminder-<seconds>.<microseconds>`. Two ids from the same
/// microsecond collide; nothing checks for that.
pub fn id_for_time(now: DateTime<Utc>) -> String {
    format!(
        "{ID_PREFIX}{}.{:06}",
        now.timestamp(),
        now.timestamp_subsec_micros()
    )
}

/// Parse `time_text`, then create a reminder titled `title` at that time.
///
/// An unparsable time aborts before anything is sent.
pub fn remind<T: Transport>(
    client: &RemindersClient<T>,
    title: &str,
    time_text: &str,
    now: DateTime<Local>,
) -> Result<Reminder, ApiError> {
    let due = parse_time_expression(time_text, now)?;
    let reminder = Reminder::new(id_for_time(now.with_timezone(&Utc)), title, due)?;
    client.create(&reminder)?;
    tracing::info!("Reminder set successfully: {reminder}");
    Ok(reminder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Arc;

    use chrono::TimeZone;

    use crate::config::RemindersConfig;
    use crate::http::{HttpRequest, HttpResponse};

    struct Counting {
        status: u16,
        calls: Cell<usize>,
    }

    impl Transport for Counting {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.calls.set(self.calls.get() + 1);
            Ok(HttpResponse::new(self.status, "{}"))
        }
    }

    fn client(status: u16) -> RemindersClient<Counting> {
        RemindersClient::with_transport(
            Arc::new(RemindersConfig::default()),
            Counting {
                status,
                calls: Cell::new(0),
            },
        )
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn id_format() {
        let t = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
        assert_eq!(id_for_time(t), "cli-reminder-1700000000.123456");
    }

    #[test]
    fn generated_ids_have_prefix() {
        assert!(generate_id().starts_with("cli-reminder-"));
    }

    #[test]
    fn remind_creates_reminder() {
        let c = client(200);
        let r = remind(&c, "Stretch", "2024-03-15 08:00", now()).unwrap();
        assert_eq!(r.title(), "Stretch");
        assert_eq!(r.due().format("%Y-%m-%d %H:%M").to_string(), "2024-03-15 08:00");
        assert!(r.id().starts_with("cli-reminder-"));
        assert_eq!(c.transport_calls(), 1);
    }

    #[test]
    fn unparsable_time_sends_nothing() {
        let c = client(200);
        let err = remind(&c, "Stretch", "blorp", now()).unwrap_err();
        assert!(matches!(err, ApiError::UnparsableTime(_)));
        assert_eq!(c.transport_calls(), 0);
    }

    #[test]
    fn rejected_create_is_an_error() {
        let c = client(500);
        assert!(matches!(
            remind(&c, "Stretch", "2024-03-15 08:00", now()).unwrap_err(),
            ApiError::Http { status: 500, .. }
        ));
    }

    impl RemindersClient<Counting> {
        fn transport_calls(&self) -> usize {
            self.transport().calls.get()
        }
    }
}
