//! End-to-end login and query flow against a scripted browser and mock servers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mal_client::auth::{BrowserLauncher, BrowserSession, Selector};
use mal_client::{
    Authenticator, AuthorizeSettings, ClientSettings, CredentialOverrides, Error, MalClient,
    Result, TokenEndpoint,
};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CALLBACK: &str = "http://localhost:8080/callback";

/// How the scripted provider answers the consent click.
#[derive(Clone, Copy)]
enum Script {
    EchoState,
    ForeignState,
    BrokenConsent,
}

#[derive(Default)]
struct Recorded {
    navigated: Option<String>,
    filled: HashMap<String, String>,
    closed: bool,
}

struct FakeLauncher {
    script: Script,
    recorded: Arc<Mutex<Recorded>>,
}

impl FakeLauncher {
    fn new(script: Script) -> Self {
        Self {
            script,
            recorded: Arc::default(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        Ok(Box::new(FakeSession {
            script: self.script,
            recorded: Arc::clone(&self.recorded),
            current: String::new(),
            state: String::new(),
        }))
    }
}

struct FakeSession {
    script: Script,
    recorded: Arc<Mutex<Recorded>>,
    current: String,
    state: String,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let parsed = Url::parse(url)?;
        self.state = parsed
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        self.recorded.lock().unwrap().navigated = Some(url.to_string());
        // Not logged in yet, so the provider bounces to its login page
        self.current = "https://myanimelist.net/login.php?from=%2Fdialog%2Fauthorization".into();
        Ok(())
    }

    async fn fill_field(&mut self, selector: &Selector, value: &str) -> Result<()> {
        self.recorded
            .lock()
            .unwrap()
            .filled
            .insert(selector.to_string(), value.to_string());
        Ok(())
    }

    async fn click(&mut self, _selector: &Selector) -> Result<()> {
        if self.current.contains("/login.php") {
            self.current = "https://myanimelist.net/dialog/authorization".into();
            return Ok(());
        }
        match self.script {
            Script::EchoState => {
                self.current = format!("{CALLBACK}?code=auth-code-1&state={}", self.state);
            }
            Script::ForeignState => {
                self.current = format!("{CALLBACK}?code=auth-code-1&state=someone-else");
            }
            Script::BrokenConsent => {
                return Err(Error::Browser("no such element: .button--primary".into()));
            }
        }
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.current.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.recorded.lock().unwrap().closed = true;
        Ok(())
    }
}

fn authorize_settings() -> AuthorizeSettings {
    AuthorizeSettings {
        authorize_url: "https://myanimelist.net/v1/oauth2/authorize".to_string(),
        code_challenge_method: "plain".to_string(),
        login_path: "/login.php".to_string(),
        settle_delay: Duration::ZERO,
    }
}

fn environment(key: &str) -> Option<String> {
    match key {
        "CLIENT_ID" => Some("client-123".to_string()),
        "CLIENT_SECRET" => Some("secret-456".to_string()),
        "MAL_USERNAME" => Some("vixon".to_string()),
        "MAL_PASSWORD" => Some("hunter2".to_string()),
        "MAL_REDIRECT_URI" => Some(CALLBACK.to_string()),
        _ => None,
    }
}

fn token_endpoint(server: &MockServer) -> TokenEndpoint {
    TokenEndpoint::new(reqwest::Client::new(), format!("{}/token", server.uri()))
}

async fn login(launcher: &FakeLauncher, server: &MockServer) -> Result<Authenticator> {
    Authenticator::from_credentials_with(
        CredentialOverrides::default(),
        environment,
        &authorize_settings(),
        launcher,
        token_endpoint(server),
    )
    .await
}

#[tokio::test]
async fn login_save_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-1"))
        .and(body_string_contains("client_id=client-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 2678400,
            "access_token": "at_login",
            "refresh_token": "rt_login"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/anime"))
        .and(header("Authorization", "Bearer at_login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"node": {"id": 20, "title": "Naruto"}}],
            "paging": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let launcher = FakeLauncher::new(Script::EchoState);
    let authenticator = login(&launcher, &server).await.unwrap();
    assert_eq!(authenticator.access_token(), "at_login");

    let navigated = {
        let recorded = launcher.recorded.lock().unwrap();
        assert!(recorded.closed);
        assert_eq!(recorded.filled.get("#loginUserName").map(String::as_str), Some("vixon"));
        assert_eq!(recorded.filled.get("#login-password").map(String::as_str), Some("hunter2"));
        recorded.navigated.clone().unwrap()
    };

    // The challenge from the authorization URL is what goes out as the verifier
    let query: HashMap<String, String> = Url::parse(&navigated)
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect();
    assert_eq!(query["code_challenge_method"], "plain");
    assert_eq!(query["redirect_uri"], CALLBACK);
    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains(&format!("code_verifier={}", query["code_challenge"])));

    let dir = tempfile::tempdir().unwrap();
    let tokens_path = dir.path().join("tokens.json");
    authenticator.save_tokens(&tokens_path).unwrap();

    let settings = ClientSettings {
        base_url: format!("{}/v2", server.uri()),
        user_agent: "mal-client-test".to_string(),
        timeout: Some(Duration::from_secs(5)),
        strict_fields: true,
    };
    let client =
        MalClient::with_fallback(&settings, None, Some(&tokens_path), token_endpoint(&server))
            .unwrap();
    let entries = client.find_anime("naruto", None, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Naruto");
}

#[tokio::test]
async fn foreign_state_aborts_before_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let launcher = FakeLauncher::new(Script::ForeignState);
    let err = login(&launcher, &server).await.unwrap_err();

    assert!(matches!(err, Error::StateMismatch));
    assert!(launcher.recorded.lock().unwrap().closed);
}

#[tokio::test]
async fn browser_failure_still_closes_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let launcher = FakeLauncher::new(Script::BrokenConsent);
    let err = login(&launcher, &server).await.unwrap_err();

    assert!(matches!(err, Error::Browser(_)));
    assert!(launcher.recorded.lock().unwrap().closed);
}

#[tokio::test]
async fn refresh_after_login_sends_client_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_login",
            "refresh_token": "rt_login"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt_login"))
        .and(body_string_contains("client_secret=secret-456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at_fresh",
            "refresh_token": "rt_fresh"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let launcher = FakeLauncher::new(Script::EchoState);
    let mut authenticator = login(&launcher, &server).await.unwrap();
    let refreshed = authenticator.refresh_tokens().await.unwrap();

    assert_eq!(refreshed.access_token, "at_fresh");
    assert_eq!(authenticator.refresh_token(), "rt_fresh");
}
