//! Authorization-code login driven through a browser
//!
//! 1. Generate PKCE material and a random `state`
//! 2. Open the authorization URL, log in if the provider asks, approve
//! 3. Read `code` and `state` from the redirect, reject a foreign `state`
//! 4. Exchange the code at the token endpoint

use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use super::browser::{BrowserLauncher, BrowserSession, Selector};
use super::credentials::Credentials;
use super::pkce::{generate_state, PkcePair};
use super::tokens::{CodeExchange, TokenEndpoint, TokenPair};
use crate::error::{Error, Result};

const USERNAME_FIELD: &str = "loginUserName";
const PASSWORD_FIELD: &str = "login-password";
const PRIMARY_BUTTON: &str = "button--primary";

/// Provider-side settings for the authorization step.
#[derive(Debug, Clone)]
pub struct AuthorizeSettings {
    pub authorize_url: String,
    pub code_challenge_method: String,
    pub login_path: String,
    pub settle_delay: Duration,
}

impl AuthorizeSettings {
    pub fn from_config(oauth: &shared::config::OAuthConfig, browser: &shared::config::BrowserConfig) -> Self {
        Self {
            authorize_url: oauth.authorize_url.clone(),
            code_challenge_method: oauth.code_challenge_method.clone(),
            login_path: oauth.login_path.clone(),
            settle_delay: Duration::from_millis(browser.settle_delay_ms),
        }
    }
}

/// Build the authorization URL the browser is sent to.
pub fn build_authorization_url(
    settings: &AuthorizeSettings,
    client_id: &str,
    state: &str,
    code_challenge: &str,
    redirect_uri: Option<&str>,
) -> Result<String> {
    let mut params = vec![
        ("response_type", "code"),
        ("client_id", client_id),
        ("state", state),
        ("code_challenge", code_challenge),
        ("code_challenge_method", settings.code_challenge_method.as_str()),
    ];
    if let Some(redirect_uri) = redirect_uri {
        params.push(("redirect_uri", redirect_uri));
    }
    let url = Url::parse_with_params(&settings.authorize_url, &params)?;
    Ok(url.into())
}

/// Authorization response read from the final redirect URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub code: String,
    pub state: Option<String>,
}

/// Extract `code` and `state` from the redirect URL's query string.
pub fn parse_redirect(redirect: &str) -> Result<AuthorizationResponse> {
    let url = Url::parse(redirect)?;
    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }
    let code = code.ok_or_else(|| Error::MissingAuthorizationCode(redirect.to_string()))?;
    Ok(AuthorizationResponse { code, state })
}

/// Run the full login and return the issued token pair.
///
/// The browser session is closed before this returns, whether the consent
/// steps succeed or not.
pub async fn authorize(
    credentials: &Credentials,
    settings: &AuthorizeSettings,
    launcher: &dyn BrowserLauncher,
    token_endpoint: &TokenEndpoint,
) -> Result<TokenPair> {
    let pkce = PkcePair::generate();
    let state = generate_state();
    let authorization_url = build_authorization_url(
        settings,
        &credentials.client_id,
        &state,
        &pkce.challenge,
        credentials.redirect_uri.as_deref(),
    )?;

    let mut session = launcher.launch().await?;
    let outcome = approve(session.as_mut(), credentials, settings, &authorization_url).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close browser session");
    }
    let redirect = outcome?;

    let response = parse_redirect(&redirect)?;
    if response.state.as_deref() != Some(state.as_str()) {
        warn!("authorization state mismatch, aborting login");
        return Err(Error::StateMismatch);
    }
    info!("authorization code received");

    let tokens = token_endpoint
        .exchange_code(&CodeExchange {
            client_id: &credentials.client_id,
            client_secret: &credentials.client_secret,
            code: &response.code,
            code_verifier: pkce.exchange_verifier(),
            redirect_uri: credentials.redirect_uri.as_deref(),
        })
        .await?;
    info!("login complete");
    Ok(tokens)
}

/// Walk the login and consent pages; returns the URL the browser ends on.
async fn approve(
    session: &mut dyn BrowserSession,
    credentials: &Credentials,
    settings: &AuthorizeSettings,
    authorization_url: &str,
) -> Result<String> {
    session.navigate(authorization_url).await?;

    let landed = session.current_url().await?;
    if is_login_page(&landed, &settings.login_path) {
        debug!("login page shown, submitting account credentials");
        session
            .fill_field(&Selector::id(USERNAME_FIELD), &credentials.username)
            .await?;
        session
            .fill_field(&Selector::id(PASSWORD_FIELD), &credentials.password)
            .await?;
        session.click(&Selector::class(PRIMARY_BUTTON)).await?;
        tokio::time::sleep(settings.settle_delay).await;
    }

    debug!("approving client access");
    session.click(&Selector::class(PRIMARY_BUTTON)).await?;
    tokio::time::sleep(settings.settle_delay).await;

    session.current_url().await
}

fn is_login_page(current: &str, login_path: &str) -> bool {
    Url::parse(current)
        .map(|url| url.path() == login_path)
        .unwrap_or(false)
}
