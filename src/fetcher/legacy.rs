//! Legacy REST backend (API v1)

use crate::auth::Session;
use crate::fetcher::api_config::LegacyApiConfig;
use crate::fetcher::http::ApiHttpClient;
use crate::fetcher::parser::ShowParser;
use crate::fetcher::{ApiResult, ApiVersion, ShowsApi};
use crate::identifier::ShowIdentifier;
use crate::{ShowListEntry, ShowMetadata, WatchedEpisode};
use async_trait::async_trait;
use tracing::debug;

/// [`ShowsApi`] over the cookie-authenticated REST endpoints
#[derive(Debug)]
pub struct LegacyApi {
    client: ApiHttpClient,
    session: Session,
    config: LegacyApiConfig,
}

impl LegacyApi {
    /// Wrap an authenticated session.
    pub fn new(client: ApiHttpClient, session: Session, config: LegacyApiConfig) -> Self {
        Self {
            client,
            session,
            config,
        }
    }
}

#[async_trait]
impl ShowsApi for LegacyApi {
    fn version(&self) -> ApiVersion {
        ApiVersion::V1
    }

    fn username(&self) -> &str {
        self.session.username()
    }

    async fn list_shows(&self) -> ApiResult<Vec<ShowListEntry>> {
        let body = self
            .client
            .get_json(&self.config.profile_shows_url(), &[], &self.session)
            .await?;
        let shows = ShowParser::parse_legacy_show_list(&body)?;
        debug!(count = shows.len(), "Fetched legacy show list");
        Ok(shows)
    }

    async fn fetch_metadata(&self, id: ShowIdentifier) -> ApiResult<ShowMetadata> {
        let body = self
            .client
            .get_json(&self.config.show_url(id), &[], &self.session)
            .await?;
        ShowParser::parse_metadata(&body)
    }

    async fn fetch_episodes(&self, id: ShowIdentifier) -> ApiResult<Vec<WatchedEpisode>> {
        let body = self
            .client
            .get_json(&self.config.watched_url(id), &[], &self.session)
            .await?;
        ShowParser::parse_episodes(&body)
    }
}
