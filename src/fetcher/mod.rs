//! Remote API access
//!
//! The core pipeline only sees the [`ShowsApi`] capability. Two concrete
//! backends implement it: [`legacy::LegacyApi`] (REST, API v1) and
//! [`rpc::RpcApi`] (JSON-RPC, API v2). [`create_api`] picks one once at
//! startup; the fetch path never branches on the version again.

use crate::auth::Credentials;
use crate::downloader::BackupConfig;
use crate::identifier::ShowIdentifier;
use crate::{ShowListEntry, ShowMetadata, WatchedEpisode};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

pub mod api_config;
pub mod http;
pub mod legacy;
pub mod parser;
pub mod rpc;

/// Classification of every failure the pipeline can observe.
///
/// The first four are transient and retried by the retry policy. The rest end
/// the current show immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connection refused, DNS failure, reset connection
    Network,
    /// Per-call timeout elapsed
    Timeout,
    /// HTTP 429
    RateLimited,
    /// HTTP 5xx
    ServerError,
    /// HTTP 401/403 or an RPC authorization error
    AuthFailed,
    /// Any other 4xx, or a rejected RPC request
    BadRequest,
    /// Response body did not have the expected shape
    ParseError,
    /// Retries were exhausted on transient failures
    Exhausted,
    /// A non-retryable failure ended the retry loop
    NonRetryable,
    /// Never attempted because a stop was requested
    Cancelled,
}

impl ErrorKind {
    /// Whether the retry policy should try again after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::RateLimited | ErrorKind::ServerError
        )
    }

    /// User-friendly description used in log messages and failure summaries.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "connection failed",
            Self::Timeout => "request timed out",
            Self::RateLimited => "rate limit exceeded",
            Self::ServerError => "server error",
            Self::AuthFailed => "authentication rejected",
            Self::BadRequest => "request rejected",
            Self::ParseError => "unexpected response format",
            Self::Exhausted => "retries exhausted",
            Self::NonRetryable => "permanent failure",
            Self::Cancelled => "cancelled before fetch",
        }
    }

    /// Suggested remediation shown next to failures.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Network => "Verify internet connectivity and DNS resolution",
            Self::Timeout => "Increase --timeout or retry on a faster connection",
            Self::RateLimited | Self::Exhausted => {
                "Reduce --workers or raise --delay, then run the backup again"
            }
            Self::ServerError => "myshows.me may be having issues, try again later",
            Self::AuthFailed => "Check your username, password and OAuth client credentials",
            Self::BadRequest | Self::NonRetryable => "The show may have been removed from the catalog",
            Self::ParseError => "The API response format may have changed",
            Self::Cancelled => "Run the backup again without interrupting it",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::AuthFailed => "auth_failed",
            Self::BadRequest => "bad_request",
            Self::ParseError => "parse_error",
            Self::Exhausted => "exhausted",
            Self::NonRetryable => "non_retryable",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Error returned by a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    /// Failure classification
    pub kind: ErrorKind,
    /// Detail for logs
    pub message: String,
}

impl ApiError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a [`ErrorKind::ParseError`].
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    /// Whether the retry policy should try again.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Result type for remote calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Which remote API generation to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiVersion {
    /// Legacy REST API with MD5 password login
    #[serde(rename = "v1")]
    V1,
    /// JSON-RPC API with OAuth
    #[serde(rename = "v2")]
    V2,
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V1 => write!(f, "v1"),
            ApiVersion::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v1" | "1" => Ok(ApiVersion::V1),
            "v2" | "2" => Ok(ApiVersion::V2),
            _ => Err(format!("Invalid API version: {s}. Valid options: v1, v2")),
        }
    }
}

/// Remote capability the backup pipeline depends on.
#[async_trait]
pub trait ShowsApi: Send + Sync {
    /// API generation implemented by this backend
    fn version(&self) -> ApiVersion;

    /// Account the session belongs to
    fn username(&self) -> &str;

    /// List every show on the user's profile.
    ///
    /// This is the identifier source for a backup run.
    async fn list_shows(&self) -> ApiResult<Vec<ShowListEntry>>;

    /// Fetch show-level metadata.
    async fn fetch_metadata(&self, id: ShowIdentifier) -> ApiResult<ShowMetadata>;

    /// Fetch the user's episode watch history for one show.
    async fn fetch_episodes(&self, id: ShowIdentifier) -> ApiResult<Vec<WatchedEpisode>>;
}

/// Shared handle to a backend
pub type SharedApi = Arc<dyn ShowsApi>;

/// Authenticate and build the backend for `version`.
///
/// The credential exchange happens here, once. The resulting
/// [`Session`](crate::auth::Session) is immutable and handed to the backend.
///
/// # Errors
///
/// Returns the classified error of the login/token call. An
/// [`ErrorKind::AuthFailed`] means the credentials are wrong.
pub async fn create_api(
    version: ApiVersion,
    credentials: &Credentials,
    config: &BackupConfig,
) -> ApiResult<SharedApi> {
    let client = http::ApiHttpClient::new(config.per_call_timeout)?;

    let api: SharedApi = match version {
        ApiVersion::V1 => {
            let settings = api_config::LEGACY_API;
            let session = credentials.login_legacy(&client, &settings).await?;
            Arc::new(legacy::LegacyApi::new(client, session, settings))
        }
        ApiVersion::V2 => {
            let settings = api_config::RPC_API;
            let session = credentials.login_oauth(&client, &settings).await?;
            Arc::new(rpc::RpcApi::new(client, session, settings))
        }
    };

    info!(api_version = %version, username = api.username(), "Authenticated");
    Ok(api)
}
