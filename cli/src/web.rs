//! Web front end: a one-page form for creating reminders plus a JSON
//! listing endpoint.
//!
//! Every request connects its own client on the blocking pool, so handlers
//! share nothing but the read-only config and the credential provider.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Local;
use reminders_core::{remind, ApiError, CredentialProvider, RemindersClient, RemindersConfig};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
pub struct AppState {
    config: Arc<RemindersConfig>,
    provider: Arc<dyn CredentialProvider>,
}

impl AppState {
    pub fn new(config: Arc<RemindersConfig>, provider: Arc<dyn CredentialProvider>) -> Self {
        Self { config, provider }
    }
}

#[derive(Debug, Deserialize)]
pub struct RemindRequest {
    pub title: String,
    pub time_str: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemindResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub n: u32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/remind", get(list_reminders).post(create_reminder))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn create_reminder(
    State(state): State<AppState>,
    Json(req): Json<RemindRequest>,
) -> Result<Json<RemindResponse>, WebError> {
    let reminder = with_client(state, move |client| {
        remind(client, &req.title, &req.time_str, Local::now())
    })
    .await?;
    Ok(Json(RemindResponse {
        response: reminder.to_string(),
    }))
}

async fn list_reminders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<RemindResponse>, WebError> {
    let entries = with_client(state, move |client| client.list(query.n, 0)).await?;
    Ok(Json(RemindResponse {
        response: crate::render_listing(entries),
    }))
}

/// Connect a client and run `op` with it off the async workers.
async fn with_client<F, R>(state: AppState, op: F) -> Result<R, WebError>
where
    F: FnOnce(&RemindersClient) -> Result<R, ApiError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let client = RemindersClient::connect(state.config, state.provider.as_ref())?;
        op(&client)
    })
    .await
    .map_err(|e| WebError::Internal(e.to_string()))?
    .map_err(WebError::Api)
}

#[derive(Debug)]
pub enum WebError {
    Api(ApiError),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            WebError::Api(err) => {
                let status = match &err {
                    ApiError::UnparsableTime(_) | ApiError::InvalidReminder(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    ApiError::NotFound => StatusCode::NOT_FOUND,
                    ApiError::AuthenticationRequired(_) | ApiError::Auth(_) => {
                        StatusCode::UNAUTHORIZED
                    }
                    ApiError::Http { .. }
                    | ApiError::Transport(_)
                    | ApiError::MalformedReminder(_)
                    | ApiError::Deserialization(_) => StatusCode::BAD_GATEWAY,
                    ApiError::Serialization(_) | ApiError::Config(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.to_string())
            }
            WebError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        tracing::warn!("request failed with {status}: {message}");
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
