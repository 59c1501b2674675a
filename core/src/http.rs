//! HTTP plumbing: plain-data requests/responses and the transport seam.
//!
//! # Design
//! `RemindersClient` builds `HttpRequest` values and parses `HttpResponse`
//! values; it never opens a socket itself. A `Transport` executes the
//! round-trip in between. `UreqTransport` is the real, blocking,
//! bearer-authenticated implementation. Tests substitute their own.
//!
//! Every call the service accepts is a POST, so requests carry no method.

use crate::error::ApiError;

/// An HTTP POST described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Executes one request and waits for the complete response.
///
/// Non-2xx statuses are data, not errors: only failures to get any response
/// at all come back as `Err`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport over ureq that adds a bearer token to every request.
pub struct UreqTransport {
    agent: ureq::Agent,
    access_token: String,
}

impl UreqTransport {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            agent: plain_agent(),
            access_token: access_token.into(),
        }
    }
}

/// A ureq agent that reports 4xx/5xx as responses rather than `Err`, leaving
/// status interpretation to the caller.
pub(crate) fn plain_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self
            .agent
            .post(&request.url)
            .header("authorization", format!("Bearer {}", self.access_token));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        tracing::debug!("POST {}", request.url);
        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
