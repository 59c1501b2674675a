//! Wire codec for the reminders service.
//!
//! # Design
//! The service speaks JSON whose object keys are protobuf field numbers.
//! Every key the client reads or writes is spelled out once, here, as a
//! `#[serde(rename = "<n>")]` on a named field:
//!
//! ```text
//! task            "1": {"2": id}       task id
//!                 "3": title
//!                 "5": date            {"1": year, "2": month, "3": day,
//!                                       "4": {"1": hour, "2": minute, "3": second}}
//!                 "8": done            1 when completed
//!                 "18": created        creation time, epoch millis (int64, often a string)
//!
//! create body     {"2": {"1": 7}, "3": {"2": id}, "4": task}
//! get/delete body {"2": [{"2": id}]}
//! list body       {"5": 1, "6": count, "16": max creation millis (optional)}
//! response        {"1": [task, ...]}   or {} when nothing matched
//! ```
//!
//! Decoding is strict about the keys above and ignores everything else.

use chrono::{Datelike, NaiveDate, Timelike};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::reminder::Reminder;

/// Fixed value the service expects under `"2"."1"` of a create body.
const CREATE_CLIENT_TAG: u32 = 7;

/// Added to the list filter timestamp. Without it the service leaves out
/// reminders created at (or slightly before) the requested timestamp.
pub const LIST_TIMESTAMP_SLACK_MILLIS: i64 = 15 * 60 * 60 * 1000;

#[derive(Serialize)]
struct CreateBody<'a> {
    #[serde(rename = "2")]
    client: ClientTag,
    #[serde(rename = "3")]
    task_id: TaskIdRef<'a>,
    #[serde(rename = "4")]
    task: OutgoingTask<'a>,
}

#[derive(Serialize)]
struct ClientTag {
    #[serde(rename = "1")]
    tag: u32,
}

#[derive(Serialize)]
struct TaskIdRef<'a> {
    #[serde(rename = "2")]
    id: &'a str,
}

#[derive(Serialize)]
struct OutgoingTask<'a> {
    #[serde(rename = "1")]
    task_id: TaskIdRef<'a>,
    #[serde(rename = "3")]
    title: &'a str,
    #[serde(rename = "5")]
    due: WireDate,
    #[serde(rename = "8")]
    done: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireDate {
    #[serde(rename = "1")]
    year: i32,
    #[serde(rename = "2")]
    month: u32,
    #[serde(rename = "3")]
    day: u32,
    #[serde(rename = "4")]
    time: WireTime,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireTime {
    #[serde(rename = "1")]
    hour: u32,
    #[serde(rename = "2")]
    minute: u32,
    #[serde(rename = "3")]
    second: u32,
}

#[derive(Serialize)]
struct IdListBody<'a> {
    #[serde(rename = "2")]
    ids: [TaskIdRef<'a>; 1],
}

#[derive(Serialize)]
struct ListBody {
    /// Boolean flag; the service only answers when it is 1.
    #[serde(rename = "5")]
    flag: u8,
    #[serde(rename = "6")]
    max_count: u32,
    #[serde(rename = "16", skip_serializing_if = "Option::is_none")]
    max_creation_timestamp_millis: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct IncomingTaskId {
    #[serde(rename = "2")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct IncomingTask {
    #[serde(rename = "1")]
    task_id: IncomingTaskId,
    #[serde(rename = "3")]
    title: String,
    #[serde(rename = "5")]
    due: WireDate,
    #[serde(rename = "18", deserialize_with = "int64")]
    created: i64,
    #[serde(rename = "8", default)]
    done: Option<Value>,
}

/// int64 fields arrive either as JSON numbers or as decimal strings.
fn int64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("not an integer: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("not an integer: {s:?}"))),
        other => Err(de::Error::custom(format!("expected integer, got {other}"))),
    }
}

fn to_json<T: Serialize>(body: &T) -> Result<String, ApiError> {
    serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Body of a create request for `reminder`.
pub fn create_req_body(reminder: &Reminder) -> Result<String, ApiError> {
    let due = reminder.due();
    let body = CreateBody {
        client: ClientTag {
            tag: CREATE_CLIENT_TAG,
        },
        task_id: TaskIdRef { id: reminder.id() },
        task: OutgoingTask {
            task_id: TaskIdRef { id: reminder.id() },
            title: reminder.title(),
            due: WireDate {
                year: due.year(),
                month: due.month(),
                day: due.day(),
                time: WireTime {
                    hour: due.hour(),
                    minute: due.minute(),
                    second: due.second(),
                },
            },
            done: 0,
        },
    };
    to_json(&body)
}

/// Body of a get request for the reminder with `id`.
pub fn get_req_body(id: &str) -> Result<String, ApiError> {
    to_json(&IdListBody {
        ids: [TaskIdRef { id }],
    })
}

/// Body of a delete request. Same shape as a get.
pub fn delete_req_body(id: &str) -> Result<String, ApiError> {
    get_req_body(id)
}

/// Body of a list request for at most `max_count` reminders created before
/// `max_creation_timestamp_millis`. A timestamp of 0 means no filter.
pub fn list_req_body(max_count: u32, max_creation_timestamp_millis: i64) -> Result<String, ApiError> {
    let filter = match max_creation_timestamp_millis {
        0 => None,
        t => Some(t.checked_add(LIST_TIMESTAMP_SLACK_MILLIS).ok_or_else(|| {
            ApiError::Serialization(format!("list timestamp filter {t} is out of range"))
        })?),
    };
    to_json(&ListBody {
        flag: 1,
        max_count,
        max_creation_timestamp_millis: filter,
    })
}

/// Decode one task object from a get or list response.
///
/// A record the codec does not recognize is logged and returned as
/// `ApiError::MalformedReminder`.
pub fn build_reminder(task: &Value) -> Result<Reminder, ApiError> {
    decode_task(task).inspect_err(|err| {
        tracing::warn!("build_reminder failed: {err}");
    })
}

fn decode_task(task: &Value) -> Result<Reminder, ApiError> {
    let malformed = |msg: String| ApiError::MalformedReminder(msg);

    let task = IncomingTask::deserialize(task).map_err(|e| malformed(e.to_string()))?;
    let WireDate {
        year,
        month,
        day,
        time,
    } = task.due;
    let due = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(time.hour, time.minute, time.second))
        .ok_or_else(|| {
            malformed(format!(
                "invalid date {year}-{month}-{day} {}:{}:{}",
                time.hour, time.minute, time.second
            ))
        })?;
    let done = task.done.as_ref().and_then(Value::as_i64) == Some(1);

    Reminder::from_parts(Some(task.task_id.id), task.title, due, Some(task.created), done)
        .map_err(|e| malformed(e.to_string()))
}
