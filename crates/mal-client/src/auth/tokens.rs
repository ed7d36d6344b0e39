//! Token pair persistence and the token endpoint
//!
//! The token file is a single JSON object with `access_token` and
//! `refresh_token`. The token endpoint is hit for two grants: the
//! authorization code exchange that finishes the login, and refresh.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Access and refresh tokens issued by the provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Read a token pair from `path`. No network call.
pub fn fetch_tokens(path: &Path) -> Result<TokenPair> {
    if !path.exists() {
        return Err(Error::MissingTokens(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path)?;
    let tokens: TokenPair = serde_json::from_str(&contents)?;
    debug!(path = %path.display(), "loaded tokens");
    Ok(tokens)
}

/// Write a token pair to `path`, replacing any existing file.
///
/// Goes through a temp file in the same directory and a rename; on unix the
/// file is owner read/write only.
pub fn write_tokens(path: &Path, tokens: &TokenPair) -> Result<()> {
    let json = serde_json::to_string(tokens)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp_path = dir.join(format!(".tokens.tmp.{}", std::process::id()));

    if let Err(e) = replace_with(&tmp_path, path, json.as_bytes()) {
        if let Err(cleanup) = std::fs::remove_file(&tmp_path) {
            debug!(path = %tmp_path.display(), error = %cleanup, "temp token file not removed");
        }
        return Err(e.into());
    }
    info!(path = %path.display(), "saved tokens");
    Ok(())
}

fn replace_with(tmp_path: &Path, path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(tmp_path, contents)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(tmp_path, path)
}

/// Client for the OAuth token endpoint.
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    http: reqwest::Client,
    url: String,
}

impl TokenEndpoint {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST a grant as a form and decode the token pair from the response.
    pub async fn request(&self, form: &[(&str, &str)]) -> Result<TokenPair> {
        let grant = form
            .iter()
            .find(|(key, _)| *key == "grant_type")
            .map(|(_, value)| *value)
            .unwrap_or("unknown");
        debug!(url = %self.url, grant, "requesting tokens");

        let response = self.http.post(&self.url).form(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        serde_json::from_str::<TokenPair>(&body).map_err(|_| Error::TokenResponse {
            status: status.as_u16(),
            body,
        })
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, exchange: &CodeExchange<'_>) -> Result<TokenPair> {
        let mut form = vec![
            ("client_id", exchange.client_id),
            ("client_secret", exchange.client_secret),
            ("grant_type", "authorization_code"),
            ("code", exchange.code),
            ("code_verifier", exchange.code_verifier),
        ];
        if let Some(redirect_uri) = exchange.redirect_uri {
            form.push(("redirect_uri", redirect_uri));
        }
        self.request(&form).await
    }

    /// Mint a new pair from a refresh token.
    ///
    /// Client credentials are included when known; the stored-token path
    /// has none.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: Option<(&str, &str)>,
    ) -> Result<TokenPair> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        if let Some((client_id, client_secret)) = client {
            form.push(("client_id", client_id));
            form.push(("client_secret", client_secret));
        }
        self.request(&form).await
    }
}

/// Form values for the authorization code grant.
#[derive(Debug, Clone, Copy)]
pub struct CodeExchange<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub code: &'a str,
    pub code_verifier: &'a str,
    pub redirect_uri: Option<&'a str>,
}
