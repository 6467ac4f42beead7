//! HTTP client adapter shared by both API backends
//!
//! Every method performs exactly one attempt and maps the outcome onto the
//! [`ErrorKind`] taxonomy. Retrying, pacing and backoff are the retry
//! policy's job, not this module's.

use crate::auth::Session;
use crate::fetcher::{ApiError, ApiResult, ErrorKind};
use reqwest::header::SET_COOKIE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("myshows-backup/", env!("CARGO_PKG_VERSION"));

/// Map an HTTP status onto the error taxonomy. `None` means success.
pub fn classify_status(status: StatusCode) -> Option<ErrorKind> {
    match status.as_u16() {
        200..=299 => None,
        429 => Some(ErrorKind::RateLimited),
        401 | 403 => Some(ErrorKind::AuthFailed),
        400..=499 => Some(ErrorKind::BadRequest),
        500..=599 => Some(ErrorKind::ServerError),
        // 1xx/3xx that reqwest did not follow
        _ => Some(ErrorKind::BadRequest),
    }
}

/// Map a transport-level reqwest error onto the error taxonomy.
pub fn classify_transport(error: &reqwest::Error) -> ErrorKind {
    if error.is_timeout() {
        ErrorKind::Timeout
    } else if error.is_decode() {
        ErrorKind::ParseError
    } else if let Some(status) = error.status() {
        classify_status(status).unwrap_or(ErrorKind::Network)
    } else {
        ErrorKind::Network
    }
}

/// Thin wrapper around a shared [`reqwest::Client`]
#[derive(Debug, Clone)]
pub struct ApiHttpClient {
    client: Arc<Client>,
    timeout: Duration,
}

impl ApiHttpClient {
    /// Build a client whose every call is bounded by `timeout`.
    pub fn new(timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::new(ErrorKind::Network, format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
            timeout,
        })
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` with `query` in the session context and decode the JSON body.
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        session: &Session,
    ) -> ApiResult<Value> {
        debug!(url, params = query.len(), "GET");
        let request = session.apply(self.client.get(url).query(query));
        let response = self.send(request, url).await?;
        Self::decode(response, url).await
    }

    /// POST a JSON body in the session context and decode the JSON response.
    pub async fn post_json(&self, url: &str, body: &Value, session: &Session) -> ApiResult<Value> {
        debug!(url, "POST");
        let request = session.apply(self.client.post(url).json(body));
        let response = self.send(request, url).await?;
        Self::decode(response, url).await
    }

    /// POST an urlencoded form without a session (token exchange).
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> ApiResult<Value> {
        debug!(url, "POST form");
        let response = self.send(self.client.post(url).form(form), url).await?;
        Self::decode(response, url).await
    }

    /// GET `url` without a session and return the `name=value` part of every
    /// `Set-Cookie` header.
    pub async fn fetch_cookies(&self, url: &str, query: &[(&str, String)]) -> ApiResult<Vec<String>> {
        debug!(url, "GET (login)");
        let response = self.send(self.client.get(url).query(query), url).await?;

        let cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(cookie_pair)
            .collect();
        Ok(cookies)
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> ApiResult<Response> {
        let response = request.send().await.map_err(|e| {
            ApiError::new(classify_transport(&e), format!("{url}: {e}"))
        })?;

        let status = response.status();
        match classify_status(status) {
            None => Ok(response),
            Some(kind) => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::new(
                    kind,
                    format!("{url}: HTTP {status}{}", snippet(&body)),
                ))
            }
        }
    }

    async fn decode(response: Response, url: &str) -> ApiResult<Value> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::new(classify_transport(&e), format!("{url}: {e}")))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::parse(format!("{url}: invalid JSON body: {e}")))
    }
}

/// `"PHPSESSID=abc; path=/; HttpOnly"` -> `"PHPSESSID=abc"`
fn cookie_pair(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    pair.contains('=').then(|| pair.to_string())
}

fn snippet(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return String::new();
    }
    let short: String = body.chars().take(120).collect();
    format!(" ({short})")
}
