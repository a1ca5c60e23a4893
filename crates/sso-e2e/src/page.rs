//! Browser page abstraction.
//!
//! The login flow only talks to [`Page`], so it runs the same against a real
//! WebDriver session ([`WebDriverPage`]) and against scripted fakes in tests.

use crate::config::E2eConfig;
use crate::error::{E2eError, E2eResult};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;
use url::Url;

/// Quiet period treated as "network idle" after the document has loaded.
pub const NETWORK_IDLE_QUIET: Duration = Duration::from_millis(500);

/// Elements a text selector is matched against.
const TEXT_CANDIDATES_XPATH: &str =
    "//button | //input[@type='submit' or @type='button'] | //a | //*[@role='button']";

/// How to find an element on the page.
#[derive(Debug, Clone)]
pub enum Selector {
    /// CSS selector, e.g. `#login` or `input[name="username"]`.
    Css(String),
    /// First clickable element whose visible text (or value) matches.
    Text(Regex),
}

impl Selector {
    pub fn css(selector: impl Into<String>) -> Self {
        Selector::Css(selector.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(css) => write!(f, "{css}"),
            Selector::Text(re) => write!(f, "text=/{}/", re.as_str()),
        }
    }
}

/// Load state a navigation wait settles on once the URL matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// `document.readyState == "complete"`.
    Load,
    /// Loaded, then no activity for [`NETWORK_IDLE_QUIET`].
    NetworkIdle,
}

/// The operations the SSO flow needs from a browser tab.
#[async_trait]
pub trait Page: Send + Sync {
    /// Current URL of the tab.
    async fn url(&self) -> E2eResult<Url>;

    async fn click(&self, selector: &Selector) -> E2eResult<()>;

    /// Replace the value of an input.
    async fn fill(&self, selector: &Selector, value: &str) -> E2eResult<()>;

    /// Wait until the tab has left `from` for a URL matching `pattern`.
    async fn wait_for_navigation(
        &self,
        pattern: &Regex,
        until: WaitUntil,
        from: &Url,
    ) -> E2eResult<Url>;
}

/// Click `selector` and wait for the navigation it triggers.
///
/// The starting URL is captured before the click so a fast redirect cannot
/// be missed.
pub async fn click_and_wait_for_navigation<P: Page + ?Sized>(
    page: &P,
    selector: &Selector,
    pattern: &Regex,
    until: WaitUntil,
) -> E2eResult<Url> {
    let from = page.url().await?;
    page.click(selector).await?;
    let to = page.wait_for_navigation(pattern, until, &from).await?;
    debug!(from = %from, to = %to, selector = %selector, "navigated");
    Ok(to)
}

/// A [`Page`] backed by a WebDriver session.
pub struct WebDriverPage {
    client: Client,
    navigation_timeout: Duration,
    poll_interval: Duration,
}

impl WebDriverPage {
    /// Open a new browser session against `config.webdriver_url`.
    ///
    /// # Errors
    ///
    /// Returns `E2eError::SessionStart` if the WebDriver server refuses the
    /// session.
    pub async fn connect(config: &E2eConfig) -> E2eResult<Self> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(browser_capabilities(config.headless));
        let client = builder.connect(&config.webdriver_url).await?;

        debug!(
            webdriver = %config.webdriver_url,
            headless = config.headless,
            "browser session started"
        );

        Ok(Self::from_client(client, config))
    }

    /// Wrap an existing session.
    #[must_use]
    pub fn from_client(client: Client, config: &E2eConfig) -> Self {
        Self {
            client,
            navigation_timeout: config.navigation_timeout,
            poll_interval: config.poll_interval,
        }
    }

    /// Navigate to `url` and wait for it to load.
    pub async fn goto(&self, url: &str) -> E2eResult<()> {
        self.client.goto(url).await?;
        Ok(())
    }

    /// Underlying WebDriver client.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// End the browser session.
    pub async fn close(self) -> E2eResult<()> {
        self.client.close().await?;
        Ok(())
    }

    async fn find(&self, selector: &Selector) -> E2eResult<Element> {
        match selector {
            Selector::Css(css) => self
                .client
                .find_all(Locator::Css(css))
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| E2eError::ElementNotFound(selector.to_string())),
            Selector::Text(pattern) => {
                let candidates = self
                    .client
                    .find_all(Locator::XPath(TEXT_CANDIDATES_XPATH))
                    .await?;
                for element in candidates {
                    if pattern.is_match(element_label(&element).await?.trim()) {
                        return Ok(element);
                    }
                }
                Err(E2eError::ElementNotFound(selector.to_string()))
            }
        }
    }

    async fn wait_for_load_state(
        &self,
        until: WaitUntil,
        deadline: Instant,
        pattern: &Regex,
    ) -> E2eResult<()> {
        loop {
            let state = self
                .client
                .execute("return document.readyState;", Vec::new())
                .await?;
            if state.as_str() == Some("complete") {
                break;
            }
            if Instant::now() >= deadline {
                let last_url = self.client.current_url().await?;
                return Err(E2eError::NavigationTimeout {
                    pattern: pattern.as_str().to_string(),
                    last_url: last_url.to_string(),
                });
            }
            sleep(self.poll_interval).await;
        }

        if until == WaitUntil::NetworkIdle {
            sleep(NETWORK_IDLE_QUIET).await;
        }
        Ok(())
    }
}

#[async_trait]
impl Page for WebDriverPage {
    async fn url(&self) -> E2eResult<Url> {
        Ok(self.client.current_url().await?)
    }

    async fn click(&self, selector: &Selector) -> E2eResult<()> {
        self.find(selector).await?.click().await?;
        Ok(())
    }

    async fn fill(&self, selector: &Selector, value: &str) -> E2eResult<()> {
        let element = self.find(selector).await?;
        element.clear().await?;
        element.send_keys(value).await?;
        Ok(())
    }

    async fn wait_for_navigation(
        &self,
        pattern: &Regex,
        until: WaitUntil,
        from: &Url,
    ) -> E2eResult<Url> {
        let deadline = Instant::now() + self.navigation_timeout;

        loop {
            let current = self.client.current_url().await?;
            if current != *from && pattern.is_match(current.as_str()) {
                self.wait_for_load_state(until, deadline, pattern).await?;
                return Ok(current);
            }
            if Instant::now() >= deadline {
                return Err(E2eError::NavigationTimeout {
                    pattern: pattern.as_str().to_string(),
                    last_url: current.to_string(),
                });
            }
            sleep(self.poll_interval).await;
        }
    }
}

/// Visible text of an element, falling back to its `value` (submit inputs).
async fn element_label(element: &Element) -> E2eResult<String> {
    let text = element.text().await?;
    if !text.trim().is_empty() {
        return Ok(text);
    }
    Ok(element.prop("value").await?.unwrap_or_default())
}

/// Capabilities requesting a headless browser from whichever driver answers.
fn browser_capabilities(headless: bool) -> Map<String, Value> {
    let mut caps = Map::new();
    if headless {
        caps.insert("moz:firefoxOptions".to_string(), json!({ "args": ["-headless"] }));
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": ["--headless=new", "--no-sandbox", "--disable-dev-shm-usage"] }),
        );
    }
    caps
}
