//! Account and client credentials for the login flow
//!
//! Every field is taken from the explicit value when one is given, otherwise
//! from the environment. Resolution happens once, before any browser or
//! network activity.

use tracing::warn;

use crate::error::{Error, Result};

pub const CLIENT_ID_VAR: &str = "CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "CLIENT_SECRET";
pub const USERNAME_VAR: &str = "MAL_USERNAME";
pub const PASSWORD_VAR: &str = "MAL_PASSWORD";
pub const REDIRECT_URI_VAR: &str = "MAL_REDIRECT_URI";

/// Explicitly supplied values, any of which may be absent.
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub redirect_uri: Option<String>,
}

/// Fully resolved credentials.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub redirect_uri: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Return the explicit value if present, else the looked-up value, else fail
/// with `MissingConfiguration` naming `key`.
pub fn resolve_setting<F>(explicit: Option<String>, key: &str, lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .filter(|value| !value.is_empty())
        .or_else(|| lookup(key).filter(|value| !value.is_empty()))
        .ok_or_else(|| Error::MissingConfiguration(key.to_string()))
}

impl Credentials {
    /// Resolve credentials against the process environment.
    pub fn resolve(overrides: CredentialOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve credentials against an arbitrary lookup.
    pub fn resolve_with<F>(overrides: CredentialOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = resolve_setting(overrides.client_id, CLIENT_ID_VAR, &lookup)?;
        let client_secret = resolve_setting(overrides.client_secret, CLIENT_SECRET_VAR, &lookup)?;
        let username = resolve_setting(overrides.username, USERNAME_VAR, &lookup)?;
        let password = resolve_setting(overrides.password, PASSWORD_VAR, &lookup)?;
        let redirect_uri = resolve_setting(overrides.redirect_uri, REDIRECT_URI_VAR, &lookup).ok();

        if redirect_uri.is_none() {
            warn!(
                "No redirect URI configured; provide one as a parameter or register it at \
                 https://myanimelist.net/apiconfig"
            );
        }

        Ok(Self {
            client_id,
            client_secret,
            username,
            password,
            redirect_uri,
        })
    }
}
