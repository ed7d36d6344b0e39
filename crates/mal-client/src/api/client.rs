//! MyAnimeList v2 API client.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use super::query::{Fields, QueryParams};
use super::types::{AnimeEntry, Page, PageEntry};
use crate::auth::{Authenticator, TokenEndpoint};
use crate::error::{Error, Result};

/// HTTP settings for the resource API
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub user_agent: String,
    /// None means requests never time out
    pub timeout: Option<Duration>,
    pub strict_fields: bool,
}

impl ClientSettings {
    pub fn from_config(api: &shared::config::ApiConfig) -> Self {
        Self {
            base_url: api.base_url.trim_end_matches('/').to_string(),
            user_agent: api.user_agent.clone(),
            timeout: api.timeout_secs.map(Duration::from_secs),
            strict_fields: api.strict_fields,
        }
    }

    /// Build the reqwest client shared by the API and token endpoint.
    pub fn http_client(&self) -> Result<Client> {
        let mut builder = Client::builder().user_agent(self.user_agent.as_str());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

/// MyAnimeList v2 client
pub struct MalClient {
    /// HTTP client
    http: Client,
    /// Base URL for the v2 API
    base_url: String,
    /// Source of the bearer token
    authenticator: Authenticator,
    /// Validate `fields` against the known field set
    strict_fields: bool,
}

impl MalClient {
    /// Create a client around an authenticator
    pub fn new(settings: &ClientSettings, authenticator: Authenticator) -> Result<Self> {
        Ok(Self {
            http: settings.http_client()?,
            base_url: settings.base_url.clone(),
            authenticator,
            strict_fields: settings.strict_fields,
        })
    }

    /// Create a client from an authenticator, or from saved tokens when no
    /// authenticator is given.
    pub fn with_fallback(
        settings: &ClientSettings,
        authenticator: Option<Authenticator>,
        tokens_path: Option<&Path>,
        token_endpoint: TokenEndpoint,
    ) -> Result<Self> {
        let authenticator = match (authenticator, tokens_path) {
            (Some(authenticator), _) => authenticator,
            (None, Some(path)) => Authenticator::from_tokens_file(path, token_endpoint)?,
            (None, None) => return Err(Error::MissingAuthenticator),
        };
        Self::new(settings, authenticator)
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn authenticator_mut(&mut self) -> &mut Authenticator {
        &mut self.authenticator
    }

    /// Resolve path segments against the base URL, percent-encoding each one.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Make an authenticated GET request
    async fn get<T: DeserializeOwned>(&self, segments: &[&str], params: &QueryParams) -> Result<T> {
        let url = self.endpoint_url(segments)?;
        debug!(url = %url, params = ?params.pairs(), "Making API request");

        let response = self
            .http
            .get(url.clone())
            .bearer_auth(self.authenticator.access_token())
            .query(params.pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(url = %url, status = %status, error = %body, "Request failed");
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let data = response.json::<T>().await?;
        debug!(url = %url, "Request successful");
        Ok(data)
    }

    fn params(
        &self,
        limit: u32,
        offset: u32,
        fields: Option<&Fields>,
        status: Option<&str>,
        sort: Option<&str>,
    ) -> Result<QueryParams> {
        QueryParams::build(limit, offset, fields, status, sort, self.strict_fields)
    }

    /// Search anime by title
    pub async fn search_anime(
        &self,
        query: &str,
        fields: Option<&Fields>,
        limit: u32,
        offset: u32,
    ) -> Result<Page<PageEntry>> {
        let params = self.params(limit, offset, fields, None, None)?.with_query(query);
        info!(query, limit, offset, "Searching anime");
        self.get(&["anime"], &params).await
    }

    /// Search anime by title and return the bare entries
    pub async fn find_anime(
        &self,
        query: &str,
        fields: Option<&Fields>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<AnimeEntry>> {
        let entries = self
            .search_anime(query, fields, limit, offset)
            .await?
            .into_entries();
        if entries.is_empty() {
            info!(query, "No anime found");
        }
        Ok(entries)
    }

    /// Fetch anime details by MAL ID
    pub async fn get_anime_details(
        &self,
        anime_id: u64,
        fields: Option<&Fields>,
        limit: u32,
        offset: u32,
    ) -> Result<AnimeEntry> {
        let params = self.params(limit, offset, fields, None, None)?;
        debug!(anime_id, "Fetching anime details");
        let id = anime_id.to_string();
        self.get(&["anime", id.as_str()], &params).await
    }

    /// Fetch a user's anime list
    ///
    /// `status` and `sort` are checked before any request is made. A `None`
    /// sort sends no `sort` parameter, leaving the order to the server; pass
    /// `Some("list_score")` to rank by score. `user_name` is percent-encoded
    /// as a single path segment.
    #[allow(clippy::too_many_arguments)]
    pub async fn get_user_anime_list(
        &self,
        user_name: &str,
        status: Option<&str>,
        fields: Option<&Fields>,
        sort: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Page<PageEntry>> {
        let params = self.params(limit, offset, fields, status, sort)?;
        info!(user_name, status, sort, limit, offset, "Fetching user anime list");
        self.get(&["users", user_name, "animelist"], &params).await
    }

    /// Fetch anime suggested for the authenticated user
    pub async fn get_suggested_anime(
        &self,
        fields: Option<&Fields>,
        sort: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Page<PageEntry>> {
        let params = self.params(limit, offset, fields, None, sort)?;
        info!(limit, offset, "Fetching suggested anime");
        self.get(&["anime", "suggestions"], &params).await
    }
}
