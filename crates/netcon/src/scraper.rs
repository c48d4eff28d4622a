use std::collections::{HashSet, VecDeque};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use futures::stream::{self, FuturesUnordered};
use futures::{StreamExt, future};
use reqwest::{Client, Url};

use crate::parser::{ParseError, parse_game_detail, parse_listing_page};
use crate::store::GameStore;

pub const LIST_PAGE: &str = "https://app.netconplay.com/games?page=1";
pub const ALLOWED_DOMAINS: [&str; 3] = [
    "netconplay.com",
    "app.netconplay.com",
    "www.netconplay.com",
];

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("URL not allowed: {0}")]
    DisallowedUrl(String),
}

/// Fetches a page body.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, ScraperError>>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        log::info!("Visiting {}", url);
        Ok(self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub list_page: String,
    pub allowed_domains: Vec<String>,
    pub list_parallelism: usize,
    pub detail_parallelism: usize,
    pub timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            list_page: LIST_PAGE.to_string(),
            allowed_domains: ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            list_parallelism: 5,
            detail_parallelism: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlStats {
    pub visited: usize,
    pub failed: usize,
    pub records: usize,
}

impl Display for CrawlStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} page(s) visited, {} failed, {} record(s) stored",
            self.visited, self.failed, self.records
        )
    }
}

/// Two-stage crawl: listing pages first, then one detail page per listed game.
#[derive(Debug, Clone)]
pub struct Crawler<F> {
    fetcher: F,
    config: CrawlConfig,
}

impl Crawler<HttpFetcher> {
    pub fn new(config: CrawlConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            fetcher: HttpFetcher::new(config.timeout)?,
            config,
        })
    }
}

impl<F: Fetcher> Crawler<F> {
    pub fn with_fetcher(fetcher: F, config: CrawlConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Resolves `href` against `base` and keeps it only if it stays on an
    /// allowed domain.
    fn resolve(&self, base: &Url, href: &str) -> Result<Url, ScraperError> {
        let url = base
            .join(href.trim())
            .map_err(|e| ParseError::UrlParse(format!("{}: {}", href, e)))?;
        let allowed = url.host_str().is_some_and(|host| {
            self.config
                .allowed_domains
                .iter()
                .any(|domain| domain.eq_ignore_ascii_case(host))
        });
        if allowed {
            Ok(url)
        } else {
            Err(ScraperError::DisallowedUrl(url.to_string()))
        }
    }

    fn list_page_url(&self) -> Result<Url, ScraperError> {
        Url::parse(&self.config.list_page).map_err(|e| {
            ScraperError::ParseError(ParseError::UrlParse(format!(
                "{}: {}",
                self.config.list_page, e
            )))
        })
    }

    /// Walks every listing page reachable through pagination links and seeds
    /// the store with identity-only records. Returns once no page is queued or
    /// in flight.
    pub async fn crawl_listing(&self, store: &GameStore) -> Result<CrawlStats, ScraperError> {
        let start = self.resolve(&self.list_page_url()?, &self.config.list_page)?;
        let limit = self.config.list_parallelism.max(1);
        let fetcher = &self.fetcher;

        let mut seen = HashSet::from([start.to_string()]);
        let mut queue = VecDeque::from([start]);
        let mut in_flight = FuturesUnordered::new();
        let mut stats = CrawlStats::default();

        loop {
            while in_flight.len() < limit {
                let Some(url) = queue.pop_front() else {
                    break;
                };
                in_flight.push(async move {
                    let result = fetcher.fetch(url.as_str()).await;
                    (url, result)
                });
            }

            let Some((url, result)) = in_flight.next().await else {
                break;
            };

            let html = match result {
                Ok(html) => html,
                Err(e) => {
                    log::error!("Failed to fetch listing page {}: {}", url, e);
                    stats.failed += 1;
                    continue;
                }
            };
            log::info!("Visited {}", url);
            stats.visited += 1;

            let page = parse_listing_page(&html);
            log::debug!("{} lists {} game(s)", url, page.games.len());
            for game in page.games {
                stats.records += 1;
                store.store(game.id.clone(), game);
            }

            for href in page.pagination {
                match self.resolve(&url, &href) {
                    Ok(next) => {
                        if seen.insert(next.to_string()) {
                            queue.push_back(next);
                        }
                    }
                    Err(e) => log::debug!("Skipping pagination link: {}", e),
                }
            }
        }

        Ok(stats)
    }

    /// Fetches the detail page of every game in the store and replaces each
    /// entry with the enriched record. Returns once every fetch has finished.
    pub async fn crawl_details(&self, store: &GameStore) -> Result<CrawlStats, ScraperError> {
        let base = self.list_page_url()?;
        let mut targets = Vec::new();
        let mut seen = HashSet::new();
        store.for_each(|id, game| match self.resolve(&base, &game.link) {
            Ok(url) => {
                if seen.insert(url.to_string()) {
                    targets.push(url);
                }
            }
            Err(e) => log::warn!("Game {} has no usable link: {}", id, e),
        });

        log::info!("Fetching {} game detail page(s)...", targets.len());

        let fetcher = &self.fetcher;
        let mut stats = CrawlStats::default();
        stream::iter(targets)
            .map(|url| async move {
                let result = fetcher.fetch(url.as_str()).await;
                (url, result)
            })
            .buffer_unordered(self.config.detail_parallelism.max(1))
            .for_each(|(url, result)| {
                store_detail(store, &url, result, &mut stats);
                future::ready(())
            })
            .await;

        Ok(stats)
    }
}

/// Parses one fetched detail page and replaces the listed record with it.
fn store_detail(
    store: &GameStore,
    url: &Url,
    result: Result<String, ScraperError>,
    stats: &mut CrawlStats,
) {
    let html = match result {
        Ok(html) => html,
        Err(e) => {
            log::error!("Failed to fetch game {}: {}", url, e);
            stats.failed += 1;
            return;
        }
    };
    log::info!("Visited {}", url);
    stats.visited += 1;

    match parse_game_detail(&html, url.as_str()) {
        Ok(Some(game)) => {
            stats.records += 1;
            store.store(game.id.clone(), game);
        }
        Ok(None) => log::debug!("{} is the listing page, skipped", url),
        Err(e) => log::warn!("Failed to parse game {}: {}", url, e),
    }
}
