//! myshows.me endpoint configuration
//!
//! Keeps the differences between the two API generations as data rather
//! than code.
//!
//! # API generations
//!
//! - **v1 (legacy REST)**: <http://api.myshows.ru>, cookie session from `/profile/login`
//! - **v2 (JSON-RPC)**: <https://api.myshows.me/v2/rpc/>, bearer token from the OAuth endpoint

/// Endpoints of the legacy REST API
#[derive(Debug, Clone)]
pub struct LegacyApiConfig {
    /// Base URL for every request (e.g., <http://api.myshows.ru>)
    pub base_url: &'static str,

    /// Login endpoint; takes `login` and MD5-hashed `password` query params
    pub login_endpoint: &'static str,

    /// User's show list, keyed by show id
    pub profile_shows_endpoint: &'static str,

    /// Show metadata prefix; the id is appended (`/shows/{id}`)
    pub show_endpoint: &'static str,
}

impl LegacyApiConfig {
    /// URL of the show metadata endpoint
    pub fn show_url(&self, id: impl std::fmt::Display) -> String {
        format!("{}{}{}", self.base_url, self.show_endpoint, id)
    }

    /// URL of the user's watched-episode map for a show
    pub fn watched_url(&self, id: impl std::fmt::Display) -> String {
        format!("{}{}{}/", self.base_url, self.profile_shows_endpoint, id)
    }

    /// URL of the user's show list
    pub fn profile_shows_url(&self) -> String {
        format!("{}{}", self.base_url, self.profile_shows_endpoint)
    }

    /// URL of the login endpoint
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, self.login_endpoint)
    }
}

/// Endpoints and method names of the JSON-RPC API
#[derive(Debug, Clone)]
pub struct RpcApiConfig {
    /// JSON-RPC endpoint
    pub rpc_url: &'static str,

    /// OAuth token endpoint (password grant)
    pub token_url: &'static str,

    /// Method listing shows with a given list status
    pub list_method: &'static str,

    /// Method returning show metadata
    pub show_method: &'static str,

    /// Method returning the user's episodes for a show
    pub episodes_method: &'static str,

    /// List statuses queried to assemble the full show list
    pub list_statuses: &'static [&'static str],
}

/// Legacy REST API (v1)
pub const LEGACY_API: LegacyApiConfig = LegacyApiConfig {
    base_url: "http://api.myshows.ru",
    login_endpoint: "/profile/login",
    profile_shows_endpoint: "/profile/shows/",
    show_endpoint: "/shows/",
};

/// JSON-RPC API (v2)
pub const RPC_API: RpcApiConfig = RpcApiConfig {
    rpc_url: "https://api.myshows.me/v2/rpc/",
    token_url: "https://myshows.me/oauth/token",
    list_method: "lists.Shows",
    show_method: "shows.GetById",
    episodes_method: "shows.GetEpisodes",
    list_statuses: &["watching", "later", "cancelled", "completed"],
};
