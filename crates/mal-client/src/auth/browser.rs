//! Browser collaborator for the interactive login
//!
//! The handshake only needs to open a page, type into two fields, click two
//! buttons and read where the browser ended up. [`BrowserLauncher`] opens a
//! session and [`BrowserSession::close`] releases it; the handshake pairs the
//! two on every exit path.

use async_trait::async_trait;
use thirtyfour::prelude::*;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Element locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Element id
    Id(String),
    /// First element carrying this class
    Class(String),
}

impl Selector {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Id(id) => write!(f, "#{id}"),
            Selector::Class(class) => write!(f, ".{class}"),
        }
    }
}

/// A live browser session.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    async fn fill_field(&mut self, selector: &Selector, value: &str) -> Result<()>;

    async fn click(&mut self, selector: &Selector) -> Result<()>;

    async fn current_url(&mut self) -> Result<String>;

    /// End the session and release the browser process.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Opens browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

fn browser_error(err: WebDriverError) -> Error {
    Error::Browser(err.to_string())
}

/// Chrome driven through a WebDriver server such as chromedriver.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    webdriver_url: String,
    headless: bool,
}

impl ChromeLauncher {
    pub fn new(webdriver_url: impl Into<String>, headless: bool) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            headless,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        let mut caps = DesiredCapabilities::chrome();
        if self.headless {
            caps.add_arg("--headless").map_err(browser_error)?;
            caps.add_arg("--no-sandbox").map_err(browser_error)?;
            caps.add_arg("--disable-dev-shm-usage").map_err(browser_error)?;
        }
        caps.add_arg("--window-size=1280,900").map_err(browser_error)?;

        let driver = WebDriver::new(self.webdriver_url.as_str(), caps)
            .await
            .map_err(|e| {
                Error::Browser(format!(
                    "could not connect to WebDriver at {}: {e}",
                    self.webdriver_url
                ))
            })?;
        info!(webdriver_url = %self.webdriver_url, headless = self.headless, "browser session started");

        Ok(Box::new(WebDriverSession { driver }))
    }
}

struct WebDriverSession {
    driver: WebDriver,
}

impl WebDriverSession {
    async fn find(&self, selector: &Selector) -> Result<WebElement> {
        let by = match selector {
            Selector::Id(id) => By::Id(id.clone()),
            Selector::Class(class) => By::ClassName(class.clone()),
        };
        self.driver
            .find(by)
            .await
            .map_err(|e| Error::Browser(format!("element {selector} not found: {e}")))
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        debug!(url, "navigating");
        self.driver.goto(url).await.map_err(browser_error)
    }

    async fn fill_field(&mut self, selector: &Selector, value: &str) -> Result<()> {
        let element = self.find(selector).await?;
        element.send_keys(value).await.map_err(browser_error)
    }

    async fn click(&mut self, selector: &Selector) -> Result<()> {
        debug!(%selector, "clicking");
        let element = self.find(selector).await?;
        element.click().await.map_err(browser_error)
    }

    async fn current_url(&mut self) -> Result<String> {
        let url = self.driver.current_url().await.map_err(browser_error)?;
        Ok(url.to_string())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.driver.quit().await.map_err(browser_error)?;
        debug!("browser session closed");
        Ok(())
    }
}
