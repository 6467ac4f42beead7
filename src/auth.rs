//! Credential exchange and session context
//!
//! Raw credentials are used exactly once, to obtain a [`Session`]. The
//! session is immutable after creation and is attached to every request by
//! the HTTP client adapter; nothing in the fetch pipeline reads or writes
//! credentials.

use crate::fetcher::api_config::{LegacyApiConfig, RpcApiConfig};
use crate::fetcher::http::ApiHttpClient;
use crate::fetcher::{ApiError, ApiResult, ErrorKind};
use md5::{Digest, Md5};
use reqwest::header::{AUTHORIZATION, COOKIE};
use reqwest::RequestBuilder;
use std::fmt;
use tracing::{debug, info};

/// Authenticated calling context
#[derive(Clone)]
pub enum Session {
    /// Legacy API: cookies returned by the login endpoint
    Cookie {
        /// Account name
        username: String,
        /// `name=value` pairs joined with `"; "`
        cookie: String,
    },
    /// JSON-RPC API: OAuth access token
    Bearer {
        /// Account name
        username: String,
        /// Access token
        token: String,
    },
}

impl Session {
    /// Account name the session belongs to
    pub fn username(&self) -> &str {
        match self {
            Session::Cookie { username, .. } | Session::Bearer { username, .. } => username,
        }
    }

    /// Attach the session to an outgoing request.
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Session::Cookie { cookie, .. } if cookie.is_empty() => request,
            Session::Cookie { cookie, .. } => request.header(COOKIE, cookie),
            Session::Bearer { token, .. } => request.header(AUTHORIZATION, format!("Bearer {token}")),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Session::Cookie { username, .. } => f
                .debug_struct("Cookie")
                .field("username", username)
                .field("cookie", &"<redacted>")
                .finish(),
            Session::Bearer { username, .. } => f
                .debug_struct("Bearer")
                .field("username", username)
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// Login material for one of the API generations
#[derive(Clone)]
pub enum Credentials {
    /// Username and plain password for the legacy API
    Legacy {
        /// Account name
        username: String,
        /// Plain password; hashed before it leaves the process
        password: String,
    },
    /// OAuth password grant for the JSON-RPC API
    OAuth {
        /// OAuth client id
        client_id: String,
        /// OAuth client secret
        client_secret: String,
        /// Account name
        username: String,
        /// Account password
        password: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Legacy { username, .. } => f
                .debug_struct("Legacy")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::OAuth {
                client_id, username, ..
            } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

impl Credentials {
    /// Legacy API credentials
    pub fn legacy(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Legacy {
            username: username.into(),
            password: password.into(),
        }
    }

    /// OAuth credentials for the JSON-RPC API
    pub fn oauth(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Credentials::OAuth {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Account name
    pub fn username(&self) -> &str {
        match self {
            Credentials::Legacy { username, .. } | Credentials::OAuth { username, .. } => username,
        }
    }

    /// Log in to the legacy API and capture its session cookies.
    pub(crate) async fn login_legacy(
        &self,
        client: &ApiHttpClient,
        config: &LegacyApiConfig,
    ) -> ApiResult<Session> {
        let Credentials::Legacy { username, password } = self else {
            return Err(ApiError::new(
                ErrorKind::BadRequest,
                "API v1 requires username/password credentials",
            ));
        };

        debug!(username, "Logging in to legacy API");
        let params = [
            ("login", username.clone()),
            ("password", hash_password(password)),
        ];
        let cookies = client.fetch_cookies(&config.login_url(), &params).await?;

        info!(username, "Authenticated via API v1");
        Ok(Session::Cookie {
            username: username.clone(),
            cookie: cookies.join("; "),
        })
    }

    /// Exchange the password grant for an OAuth access token.
    pub(crate) async fn login_oauth(
        &self,
        client: &ApiHttpClient,
        config: &RpcApiConfig,
    ) -> ApiResult<Session> {
        let Credentials::OAuth {
            client_id,
            client_secret,
            username,
            password,
        } = self
        else {
            return Err(ApiError::new(
                ErrorKind::BadRequest,
                "API v2 requires OAuth client credentials",
            ));
        };

        debug!(username, client_id, "Requesting OAuth token");
        let form = [
            ("grant_type", "password"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("username", username.as_str()),
            ("password", password.as_str()),
        ];
        let body = client.post_form(config.token_url, &form).await?;

        let token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::parse("token response is missing access_token"))?;

        info!(username, "Authenticated via OAuth");
        Ok(Session::Bearer {
            username: username.clone(),
            token: token.to_string(),
        })
    }
}

/// Hex MD5 digest the legacy login endpoint expects instead of the password.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Md5::digest(password.as_bytes()))
}
