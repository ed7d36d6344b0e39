//! Token owner handed to the catalog client
//!
//! An [`Authenticator`] is built either by running the browser login with
//! resolved credentials, or from a previously saved token file.

use std::path::Path;

use tracing::info;

use super::browser::BrowserLauncher;
use super::credentials::{CredentialOverrides, Credentials};
use super::handshake::{authorize, AuthorizeSettings};
use super::tokens::{fetch_tokens, write_tokens, TokenEndpoint, TokenPair};
use crate::error::Result;

/// Holds the current token pair and what is needed to refresh it.
#[derive(Debug, Clone)]
pub struct Authenticator {
    tokens: TokenPair,
    token_endpoint: TokenEndpoint,
    credentials: Option<Credentials>,
}

impl Authenticator {
    /// Resolve credentials, run the browser login and keep the issued pair.
    ///
    /// Missing credentials fail before the browser is launched.
    pub async fn from_credentials(
        overrides: CredentialOverrides,
        settings: &AuthorizeSettings,
        launcher: &dyn BrowserLauncher,
        token_endpoint: TokenEndpoint,
    ) -> Result<Self> {
        Self::from_credentials_with(
            overrides,
            |key| std::env::var(key).ok(),
            settings,
            launcher,
            token_endpoint,
        )
        .await
    }

    /// Same as [`Self::from_credentials`], resolving fallbacks through `lookup`.
    pub async fn from_credentials_with<F>(
        overrides: CredentialOverrides,
        lookup: F,
        settings: &AuthorizeSettings,
        launcher: &dyn BrowserLauncher,
        token_endpoint: TokenEndpoint,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::resolve_with(overrides, lookup)?;
        Self::login(credentials, settings, launcher, token_endpoint).await
    }

    /// Run the browser login with already resolved credentials.
    pub async fn login(
        credentials: Credentials,
        settings: &AuthorizeSettings,
        launcher: &dyn BrowserLauncher,
        token_endpoint: TokenEndpoint,
    ) -> Result<Self> {
        info!(client_id = %credentials.client_id, user = %credentials.username, "starting login");
        let tokens = authorize(&credentials, settings, launcher, &token_endpoint).await?;
        Ok(Self {
            tokens,
            token_endpoint,
            credentials: Some(credentials),
        })
    }

    /// Load a previously saved token pair.
    pub fn from_tokens_file(path: &Path, token_endpoint: TokenEndpoint) -> Result<Self> {
        let tokens = Self::fetch_tokens(path)?;
        Ok(Self::from_tokens(tokens, token_endpoint))
    }

    /// Wrap an existing token pair.
    pub fn from_tokens(tokens: TokenPair, token_endpoint: TokenEndpoint) -> Self {
        Self {
            tokens,
            token_endpoint,
            credentials: None,
        }
    }

    /// Read a token pair from disk without any network call.
    pub fn fetch_tokens(path: &Path) -> Result<TokenPair> {
        fetch_tokens(path)
    }

    /// Persist the current token pair, overwriting `path`.
    pub fn save_tokens(&self, path: &Path) -> Result<()> {
        write_tokens(path, &self.tokens)
    }

    /// Mint a new pair from the refresh token and replace the current one.
    ///
    /// The new pair is not written to disk; call [`Self::save_tokens`].
    pub async fn refresh_tokens(&mut self) -> Result<TokenPair> {
        let client = self
            .credentials
            .as_ref()
            .map(|c| (c.client_id.as_str(), c.client_secret.as_str()));
        let tokens = self
            .token_endpoint
            .refresh(&self.tokens.refresh_token, client)
            .await?;
        info!("tokens refreshed");
        self.tokens = tokens.clone();
        Ok(tokens)
    }

    pub fn tokens(&self) -> &TokenPair {
        &self.tokens
    }

    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.tokens.refresh_token
    }
}
