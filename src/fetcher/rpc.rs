//! JSON-RPC backend (API v2)
//!
//! Every call is a `POST` of `{"jsonrpc": "2.0", "method", "params", "id"}`.
//! A response carries either `result` or an `error` object; the latter is
//! classified by its code the same way HTTP statuses are.

use crate::auth::Session;
use crate::fetcher::api_config::RpcApiConfig;
use crate::fetcher::http::ApiHttpClient;
use crate::fetcher::parser::ShowParser;
use crate::fetcher::{ApiError, ApiResult, ApiVersion, ErrorKind, ShowsApi};
use crate::identifier::ShowIdentifier;
use crate::{ShowListEntry, ShowMetadata, WatchedEpisode};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Map a JSON-RPC error code onto the error taxonomy.
///
/// The API reuses HTTP codes for auth and throttling; the reserved
/// `-32xxx` range marks malformed calls, except `-32603` (internal error).
pub fn classify_rpc_code(code: i64) -> ErrorKind {
    match code {
        401 | 403 => ErrorKind::AuthFailed,
        429 => ErrorKind::RateLimited,
        500..=599 | -32603 => ErrorKind::ServerError,
        -32700..=-32600 => ErrorKind::BadRequest,
        -32099..=-32000 => ErrorKind::ServerError,
        _ => ErrorKind::BadRequest,
    }
}

/// [`ShowsApi`] over the bearer-authenticated JSON-RPC endpoint
#[derive(Debug)]
pub struct RpcApi {
    client: ApiHttpClient,
    session: Session,
    config: RpcApiConfig,
    next_id: AtomicU64,
}

impl RpcApi {
    /// Wrap an authenticated session.
    pub fn new(client: ApiHttpClient, session: Session, config: RpcApiConfig) -> Self {
        Self {
            client,
            session,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> ApiResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        debug!(method, id, "RPC call");
        let response = self
            .client
            .post_json(self.config.rpc_url, &request, &self.session)
            .await?;
        Self::unwrap_response(method, response)
    }

    fn unwrap_response(method: &str, mut response: Value) -> ApiResult<Value> {
        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(ApiError::new(
                classify_rpc_code(code),
                format!("{method}: RPC error {code}: {message}"),
            ));
        }

        match response.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(ApiError::parse(format!(
                "{method}: response has neither result nor error"
            ))),
        }
    }
}

#[async_trait]
impl ShowsApi for RpcApi {
    fn version(&self) -> ApiVersion {
        ApiVersion::V2
    }

    fn username(&self) -> &str {
        self.session.username()
    }

    /// Union of every list status.
    ///
    /// Any failing status fails the whole call, so a retry re-reads every
    /// status and a partial list is never returned.
    async fn list_shows(&self) -> ApiResult<Vec<ShowListEntry>> {
        let mut shows = Vec::new();

        for status in self.config.list_statuses {
            let entries = self
                .call(self.config.list_method, json!({ "list": status }))
                .await
                .and_then(|result| ShowParser::parse_rpc_show_list(&result, status))
                .map_err(|e| {
                    warn!(status, error = %e, "Failed to get shows with status");
                    ApiError::new(e.kind, format!("list {status}: {}", e.message))
                })?;
            debug!(status, count = entries.len(), "Fetched show list");
            shows.extend(entries);
        }

        Ok(shows)
    }

    async fn fetch_metadata(&self, id: ShowIdentifier) -> ApiResult<ShowMetadata> {
        let result = self
            .call(self.config.show_method, json!({ "showId": id.get() }))
            .await?;
        ShowParser::parse_metadata(&result)
    }

    async fn fetch_episodes(&self, id: ShowIdentifier) -> ApiResult<Vec<WatchedEpisode>> {
        let result = self
            .call(
                self.config.episodes_method,
                json!({ "showId": id.get(), "isWatched": true }),
            )
            .await?;
        ShowParser::parse_episodes(&result)
    }
}
