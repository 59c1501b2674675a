//! Reminders client: request building, response parsing and execution.
//!
//! # Design
//! `RemindersClient` splits every operation into `build_*` (pure,
//! produces an `HttpRequest`) and `parse_*` (pure, consumes an
//! `HttpResponse`). The executing methods (`create`, `get`, `delete`,
//! `list`) glue the two together through the client's `Transport`, one
//! blocking POST per call and no retries.
//!
//! Success is gated solely on HTTP 200. Failures are logged here and handed
//! back as `ApiError` values so the presentation layer decides what the user
//! sees.

use std::sync::Arc;

use serde_json::Value;

use crate::auth::CredentialProvider;
use crate::config::{Operation, RemindersConfig};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::reminder::Reminder;
use crate::wire;

/// One slot of a list result. Records the codec could not decode stay in
/// place as `Err(ApiError::MalformedReminder)`.
pub type ListEntry = Result<Reminder, ApiError>;

/// Client for the reminders service.
pub struct RemindersClient<T = Box<dyn Transport + Send>> {
    config: Arc<RemindersConfig>,
    transport: T,
}

impl RemindersClient {
    /// Obtain an authenticated transport from `provider` and wrap it.
    ///
    /// With the OAuth provider this may block on interactive user consent.
    pub fn connect(
        config: Arc<RemindersConfig>,
        provider: &dyn CredentialProvider,
    ) -> Result<Self, ApiError> {
        let transport = provider.obtain_transport()?;
        Ok(Self { config, transport })
    }
}

impl<T: Transport> RemindersClient<T> {
    pub fn with_transport(config: Arc<RemindersConfig>, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &RemindersConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn request(&self, op: Operation, body: String) -> HttpRequest {
        HttpRequest {
            url: self.config.endpoints.uri(op).to_string(),
            headers: vec![("content-type".to_string(), self.config.content_type.clone())],
            body,
        }
    }

    pub fn build_create(&self, reminder: &Reminder) -> Result<HttpRequest, ApiError> {
        Ok(self.request(Operation::Create, wire::create_req_body(reminder)?))
    }

    pub fn build_get(&self, id: &str) -> Result<HttpRequest, ApiError> {
        Ok(self.request(Operation::Get, wire::get_req_body(id)?))
    }

    pub fn build_delete(&self, id: &str) -> Result<HttpRequest, ApiError> {
        Ok(self.request(Operation::Delete, wire::delete_req_body(id)?))
    }

    pub fn build_list(
        &self,
        max_count: u32,
        max_creation_timestamp_millis: i64,
    ) -> Result<HttpRequest, ApiError> {
        let body = wire::list_req_body(max_count, max_creation_timestamp_millis)?;
        Ok(self.request(Operation::List, body))
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, Operation::Create)
    }

    /// `{}` means no reminder matched; otherwise the first task of `"1"` is
    /// decoded.
    pub fn parse_get(&self, response: HttpResponse) -> Result<Reminder, ApiError> {
        check_status(&response, Operation::Get)?;
        let body = parse_object(&response.body)?;
        if body.is_empty() {
            return Err(ApiError::NotFound);
        }
        let task = body
            .get("1")
            .and_then(Value::as_array)
            .and_then(|tasks| tasks.first())
            .ok_or_else(|| {
                let err = ApiError::MalformedReminder("get response carries no task".into());
                tracing::warn!("{err}");
                err
            })?;
        wire::build_reminder(task)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response, Operation::Delete)
    }

    /// A body without `"1"` is the service's way of saying "none found".
    pub fn parse_list(&self, response: HttpResponse) -> Result<Vec<ListEntry>, ApiError> {
        check_status(&response, Operation::List)?;
        let body = parse_object(&response.body)?;
        match body.get("1") {
            None => Ok(Vec::new()),
            Some(Value::Array(tasks)) => Ok(tasks.iter().map(wire::build_reminder).collect()),
            Some(other) => Err(ApiError::Deserialization(format!(
                "expected a task list under \"1\", got {other}"
            ))),
        }
    }

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.transport.execute(request).inspect_err(|err| {
            tracing::error!("request to {} failed: {err}", request.url);
        })
    }

    /// Create `reminder` on the service.
    pub fn create(&self, reminder: &Reminder) -> Result<(), ApiError> {
        let request = self.build_create(reminder)?;
        self.parse_create(self.send(&request)?)
    }

    /// Fetch the reminder with `id`.
    pub fn get(&self, id: &str) -> Result<Reminder, ApiError> {
        let request = self.build_get(id)?;
        self.parse_get(self.send(&request)?).inspect_err(|err| {
            if matches!(err, ApiError::NotFound) {
                tracing::warn!("Couldn't find reminder with id={id}");
            }
        })
    }

    /// Delete the reminder with `id`.
    pub fn delete(&self, id: &str) -> Result<(), ApiError> {
        let request = self.build_delete(id)?;
        self.parse_delete(self.send(&request)?)
    }

    /// The last `max_count` reminders created before
    /// `max_creation_timestamp_millis` (0 for no limit), in service order.
    pub fn list(
        &self,
        max_count: u32,
        max_creation_timestamp_millis: i64,
    ) -> Result<Vec<ListEntry>, ApiError> {
        let request = self.build_list(max_count, max_creation_timestamp_millis)?;
        let entries = self.parse_list(self.send(&request)?)?;
        tracing::debug!("list returned {} entries", entries.len());
        Ok(entries)
    }
}

/// Anything but 200 is a failure, reported with the endpoint, status and body.
fn check_status(response: &HttpResponse, op: Operation) -> Result<(), ApiError> {
    if response.status == 200 {
        return Ok(());
    }
    tracing::error!(
        operation = op.as_str(),
        status = response.status,
        body = %response.body,
        "request rejected by reminders service"
    );
    Err(ApiError::Http {
        operation: op.as_str(),
        status: response.status,
        body: response.body.clone(),
    })
}

fn parse_object(body: &str) -> Result<serde_json::Map<String, Value>, ApiError> {
    match serde_json::from_str(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ApiError::Deserialization(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(ApiError::Deserialization(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use chrono::NaiveDate;
    use serde_json::json;

    /// Replays one canned response and remembers the request it saw.
    struct Canned {
        response: Result<HttpResponse, String>,
        seen: RefCell<Option<HttpRequest>>,
    }

    impl Canned {
        fn ok(status: u16, body: &str) -> Self {
            Self {
                response: Ok(HttpResponse::new(status, body)),
                seen: RefCell::new(None),
            }
        }
    }

    impl Transport for Canned {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            *self.seen.borrow_mut() = Some(request.clone());
            self.response.clone().map_err(ApiError::Transport)
        }
    }

    fn client(transport: Canned) -> RemindersClient<Canned> {
        let config = RemindersConfig::default().with_base_url("http://localhost:3000");
        RemindersClient::with_transport(Arc::new(config), transport)
    }

    fn task(id: &str, day: u32) -> Value {
        json!({
            "1": {"2": id},
            "3": format!("task {id}"),
            "5": {"1": 2024, "2": 1, "3": day, "4": {"1": 9, "2": 0, "3": 0}},
            "18": "1700000000000"
        })
    }

    fn reminder() -> Reminder {
        let due = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Reminder::new("cli-reminder-1", "Dentist", due).unwrap()
    }

    #[test]
    fn build_create_targets_create_endpoint() {
        let c = client(Canned::ok(200, "{}"));
        let req = c.build_create(&reminder()).unwrap();
        assert_eq!(req.url, "http://localhost:3000/v1internalOP/reminders/create");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json+protobuf".to_string())]
        );
        let body: Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(body["4"]["3"], "Dentist");
    }

    #[test]
    fn build_list_encodes_filter() {
        let c = client(Canned::ok(200, "{}"));
        let req = c.build_list(10, 1_000).unwrap();
        assert_eq!(req.url, "http://localhost:3000/v1internalOP/reminders/list");
        let body: Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(body, json!({"5": 1, "6": 10, "16": 54_001_000}));
    }

    #[test]
    fn create_succeeds_on_200() {
        let c = client(Canned::ok(200, "{}"));
        c.create(&reminder()).unwrap();
        let seen = c.transport.seen.borrow().clone().unwrap();
        assert!(seen.url.ends_with("/create"));
    }

    #[test]
    fn create_reports_status_and_body() {
        let c = client(Canned::ok(401, "login required"));
        let err = c.create(&reminder()).unwrap_err();
        match err {
            ApiError::Http {
                operation,
                status,
                body,
            } => {
                assert_eq!(operation, "create");
                assert_eq!(status, 401);
                assert_eq!(body, "login required");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn transport_failure_is_returned() {
        let c = client(Canned {
            response: Err("connection refused".to_string()),
            seen: RefCell::new(None),
        });
        assert!(matches!(c.delete("x").unwrap_err(), ApiError::Transport(_)));
    }

    #[test]
    fn get_decodes_first_task() {
        let body = json!({"1": [task("a", 3)]}).to_string();
        let r = client(Canned::ok(200, &body)).get("a").unwrap();
        assert_eq!(r.id(), "a");
        assert_eq!(r.title(), "task a");
    }

    #[test]
    fn get_empty_object_is_not_found() {
        let err = client(Canned::ok(200, "{}")).get("missing").unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn get_non_200_is_http_error_not_not_found() {
        let err = client(Canned::ok(500, "boom")).get("x").unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, .. }));
    }

    #[test]
    fn get_undecodable_task_is_malformed() {
        let body = json!({"1": [{"3": "no id"}]}).to_string();
        let err = client(Canned::ok(200, &body)).get("x").unwrap_err();
        assert!(matches!(err, ApiError::MalformedReminder(_)));
    }

    #[test]
    fn get_bad_json_is_deserialization_error() {
        let err = client(Canned::ok(200, "not json")).get("x").unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn delete_succeeds_on_200() {
        let c = client(Canned::ok(200, "{}"));
        c.delete("abc").unwrap();
        let seen = c.transport.seen.borrow().clone().unwrap();
        assert!(seen.url.ends_with("/delete"));
        assert_eq!(seen.body, r#"{"2":[{"2":"abc"}]}"#);
    }

    #[test]
    fn list_without_key_1_is_empty() {
        let entries = client(Canned::ok(200, "{}")).list(10, 0).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn list_keeps_service_order() {
        let body = json!({"1": [task("b", 9), task("a", 1), task("c", 5)]}).to_string();
        let entries = client(Canned::ok(200, &body)).list(10, 0).unwrap();
        let ids: Vec<_> = entries
            .iter()
            .map(|e| e.as_ref().unwrap().id().to_string())
            .collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn list_keeps_malformed_entries_in_place() {
        let body = json!({"1": [task("a", 1), {"1": {}}, task("c", 5)]}).to_string();
        let entries = client(Canned::ok(200, &body)).list(10, 0).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_ok());
        assert!(matches!(entries[1], Err(ApiError::MalformedReminder(_))));
        assert!(entries[2].is_ok());
    }

    #[test]
    fn list_error_is_distinct_from_empty() {
        let err = client(Canned::ok(503, "unavailable")).list(10, 0).unwrap_err();
        assert!(matches!(err, ApiError::Http { operation: "list", .. }));
    }
}
