//! In-memory stand-in for the reminders service.
//!
//! Speaks the same numerically-keyed JSON over the same four POST endpoints,
//! insists on the `application/json+protobuf` content type and a bearer
//! token, and stamps `"18"` (creation millis, as a string) on every task it
//! stores. Tasks are kept exactly as received so tests can seed records the
//! client is not able to decode.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const CONTENT_TYPE: &str = "application/json+protobuf";

#[derive(Debug, Default)]
pub struct Store {
    tasks: HashMap<String, Value>,
    last_created: i64,
}

impl Store {
    /// Store `task` under `id`, stamping a creation time later than any
    /// previous one. Returns the stamp.
    pub fn insert(&mut self, id: &str, mut task: Value) -> i64 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        self.last_created = now.max(self.last_created + 1);
        if let Some(obj) = task.as_object_mut() {
            obj.insert("18".to_string(), json!(self.last_created.to_string()));
        }
        self.tasks.insert(id.to_string(), task);
        self.last_created
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with_db(Db::default())
}

pub fn app_with_db(db: Db) -> Router {
    Router::new()
        .route("/v1internalOP/reminders/create", post(create_reminder))
        .route("/v1internalOP/reminders/get", post(get_reminders))
        .route("/v1internalOP/reminders/delete", post(delete_reminders))
        .route("/v1internalOP/reminders/list", post(list_reminders))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_db(listener, Db::default()).await
}

pub async fn run_with_db(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_db(db)).await
}

/// Checks the headers the real service insists on and decodes the body.
fn accept(headers: &HeaderMap, body: &str) -> Result<Value, StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type != CONTENT_TYPE {
        return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer ") && v.len() > "Bearer ".len());
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }
    serde_json::from_str(body).map_err(|_| StatusCode::BAD_REQUEST)
}

/// Ids from a get/delete body: `{"2": [{"2": id}, ...]}`.
fn requested_ids(body: &Value) -> Result<Vec<String>, StatusCode> {
    body["2"]
        .as_array()
        .ok_or(StatusCode::BAD_REQUEST)?
        .iter()
        .map(|entry| {
            entry["2"]
                .as_str()
                .map(str::to_string)
                .ok_or(StatusCode::BAD_REQUEST)
        })
        .collect()
}

fn created_millis(task: &Value) -> i64 {
    task["18"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .or_else(|| task["18"].as_i64())
        .unwrap_or_default()
}

/// `{}` for no tasks, `{"1": [...]}` otherwise.
fn task_list(tasks: Vec<Value>) -> Json<Value> {
    if tasks.is_empty() {
        Json(json!({}))
    } else {
        Json(json!({ "1": tasks }))
    }
}

async fn create_reminder(
    State(db): State<Db>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, StatusCode> {
    let body = accept(&headers, &body)?;
    let task = body["4"].clone();
    let id = task["1"]["2"]
        .as_str()
        .map(str::to_string)
        .ok_or(StatusCode::BAD_REQUEST)?;
    if body["2"]["1"] != json!(7) || body["3"]["2"] != json!(id) {
        return Err(StatusCode::BAD_REQUEST);
    }
    db.write().await.insert(&id, task);
    tracing::debug!("created {id}");
    Ok(Json(json!({ "1": { "2": id } })))
}

async fn get_reminders(
    State(db): State<Db>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, StatusCode> {
    let body = accept(&headers, &body)?;
    let ids = requested_ids(&body)?;
    let store = db.read().await;
    let found = ids
        .iter()
        .filter_map(|id| store.tasks.get(id).cloned())
        .collect();
    Ok(task_list(found))
}

async fn delete_reminders(
    State(db): State<Db>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, StatusCode> {
    let body = accept(&headers, &body)?;
    let ids = requested_ids(&body)?;
    let mut store = db.write().await;
    for id in ids {
        store.tasks.remove(&id);
    }
    Ok(Json(json!({})))
}

/// Newest first, at most `"6"` tasks, created strictly before `"16"` if set.
async fn list_reminders(
    State(db): State<Db>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, StatusCode> {
    let body = accept(&headers, &body)?;
    if body["5"] != json!(1) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let max_count = body["6"].as_u64().ok_or(StatusCode::BAD_REQUEST)? as usize;
    let before = body["16"].as_i64();

    let store = db.read().await;
    let mut tasks: Vec<Value> = store
        .tasks
        .values()
        .filter(|task| before.map_or(true, |limit| created_millis(task) < limit))
        .cloned()
        .collect();
    tasks.sort_by_key(|task| std::cmp::Reverse(created_millis(task)));
    tasks.truncate(max_count);
    Ok(task_list(tasks))
}
