//! Search result pages: which job detail pages a term and page number lead to.

use std::ffi::OsStr;
use std::fmt::Display;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use url::Url;

use crate::error::{FetchError, ListingError};
use crate::options::CrawlerOptions;

static LISTING_CARD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".card-title-link.bold").expect("listing card selector"));

/// A stateful client that returns documents after their scripts ran.
#[async_trait]
pub trait BrowserClient: Send + Sync {
    async fn rendered_html(&self, url: &str) -> Result<String, FetchError>;
}

/// How Chrome is launched, kept so a crashed browser can be replaced.
#[derive(Debug, Clone, Copy)]
pub struct ChromeConfig {
    pub headless: bool,
    /// Bounds how long the tab waits for navigation and elements.
    pub implicit_wait: Duration,
    /// How long the browser may go without CDP traffic before it exits.
    /// Detail pages are fetched between two listing pages, so this must
    /// outlast a whole page of extractions.
    pub idle_timeout: Duration,
}

struct Session {
    browser: Browser,
    tab: Arc<Tab>,
}

impl Session {
    fn launch(config: &ChromeConfig) -> Result<Self, FetchError> {
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .idle_browser_timeout(config.idle_timeout)
            .args(vec![OsStr::new("--deny-permission-prompts")])
            .build()
            .map_err(browser_error)?;
        let browser = Browser::new(options).map_err(browser_error)?;
        let tab = browser.new_tab().map_err(browser_error)?;
        tab.set_default_timeout(config.implicit_wait);
        tracing::info!(headless = config.headless, "browser: launched");
        Ok(Self { browser, tab })
    }

    fn load(&self, url: &str) -> Result<String, FetchError> {
        self.tab.navigate_to(url).map_err(browser_error)?;
        self.tab.wait_until_navigated().map_err(browser_error)?;
        self.tab.get_content().map_err(browser_error)
    }
}

/// A single headless Chrome tab, reused for every listing page. The browser
/// is relaunched when a failed load finds its connection gone.
pub struct ChromeBrowser {
    config: ChromeConfig,
    session: Arc<Mutex<Session>>,
}

impl ChromeBrowser {
    pub fn launch(config: ChromeConfig) -> Result<Self, FetchError> {
        let session = Session::launch(&config)?;
        Ok(Self {
            config,
            session: Arc::new(Mutex::new(session)),
        })
    }
}

#[async_trait]
impl BrowserClient for ChromeBrowser {
    async fn rendered_html(&self, url: &str) -> Result<String, FetchError> {
        let session = Arc::clone(&self.session);
        let config = self.config;
        let url = url.to_string();
        tokio::task::spawn_blocking(move || -> Result<String, FetchError> {
            let mut session = session.lock().map_err(browser_error)?;
            let err = match session.load(&url) {
                Ok(html) => return Ok(html),
                Err(err) => err,
            };
            if session.browser.get_version().is_err() {
                tracing::warn!("browser: connection lost, relaunching");
                *session = Session::launch(&config)?;
            }
            Err(err)
        })
        .await
        .map_err(browser_error)?
    }
}

fn browser_error(err: impl Display) -> FetchError {
    FetchError::Browser(err.to_string())
}

/// The search results URL for `term` on `page`, under the path of `base`.
pub fn listing_url(base: &Url, term: &str, page: u32) -> Result<Url, url::ParseError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push("jobs");
    url.query_pairs_mut()
        .clear()
        .append_pair("q", term)
        .append_pair("countryCode", "US")
        .append_pair("radius", "30")
        .append_pair("radiusUnit", "mi")
        .append_pair("page", &page.to_string())
        .append_pair("pageSize", "100")
        .append_pair("language", "en");
    Ok(url)
}

/// The href of every listing card, without its query string.
pub fn parse_listing_urls(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LISTING_CARD)
        .filter_map(|card| card.value().attr("href"))
        .map(|href| href.split_once('?').map_or(href, |(path, _)| path).to_string())
        .collect()
}

pub struct ListingRetriever {
    browser: Arc<dyn BrowserClient>,
    base_url: Url,
    max_tries: u32,
    retry_delay: Duration,
}

impl ListingRetriever {
    pub fn new(browser: Arc<dyn BrowserClient>, options: &CrawlerOptions) -> Self {
        Self {
            browser,
            base_url: options.base_url.clone(),
            max_tries: options.max_listing_tries,
            retry_delay: options.retry_delay,
        }
    }

    /// Fetches the listing URLs of one results page.
    ///
    /// An empty page usually means the scripts had not rendered yet, so the
    /// same page is fetched again, `max_tries` times in total. If no attempt
    /// produced a document at all the browser is unusable and the last fetch
    /// error is returned as [`ListingError::Unreachable`].
    pub async fn retrieve(&self, term: &str, page: u32) -> Result<Vec<String>, ListingError> {
        let url = listing_url(&self.base_url, term, page)?;
        let mut last_error = None;
        let mut rendered = false;

        for attempt in 1..=self.max_tries {
            match self.browser.rendered_html(url.as_str()).await {
                Ok(html) => {
                    rendered = true;
                    let urls = parse_listing_urls(&html);
                    if !urls.is_empty() {
                        tracing::info!(
                            term,
                            page,
                            count = urls.len(),
                            "listing: retrieved job listing URLs"
                        );
                        return Ok(urls);
                    }
                    tracing::warn!(term, page, attempt, "listing: no job listing URLs");
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(term, page, attempt, "listing: fetch failed: {}", err);
                    last_error = Some(err);
                }
                Err(err) => return Err(err.into()),
            }

            if attempt < self.max_tries && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        match last_error {
            Some(source) if !rendered => Err(ListingError::Unreachable {
                attempts: self.max_tries,
                source,
            }),
            _ => Err(ListingError::Exhausted {
                attempts: self.max_tries,
            }),
        }
    }
}
