use crate::config;
use http::{HeaderMap, HeaderValue, header};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

mod retry;

pub use retry::Retry;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest_middleware::Error,
    },
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: StatusCode },
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Clone, Debug)]
pub struct Opts {
    /// Minimum time between the end of one request and the start of the next
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries
    pub backoff: Duration,
    pub user_agent: String,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            request_delay: config::DEFAULT_DELAY,
            request_timeout: config::REQUEST_TIMEOUT,
            max_retries: config::MAX_RETRIES,
            backoff: config::BACKOFF_BASE,
            user_agent: config::USER_AGENT.into(),
        }
    }
}

impl Opts {
    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers
    }

    fn build_client(&self) -> reqwest::Result<ClientWithMiddleware> {
        let client = reqwest::ClientBuilder::new()
            .user_agent(&self.user_agent)
            .default_headers(Self::default_headers())
            .timeout(self.request_timeout)
            .build()?;
        Ok(ClientBuilder::new(client)
            .with(Retry::new(self.max_retries, self.backoff))
            .build())
    }
}

/// HTTP client that waits at least `request_delay` between requests and retries transient
/// failures. The underlying connection pool is created on first use and released on `close` or
/// drop.
pub struct Client {
    opts: Opts,
    client: Option<ClientWithMiddleware>,
    last_request: Option<Instant>,
}

impl Client {
    pub fn new(opts: Opts) -> Self {
        Self {
            opts,
            client: None,
            last_request: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    /// Drop the connection pool. A later `get` will build a new one.
    pub fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("HTTP client closed");
        }
    }

    fn client(&mut self) -> Result<&ClientWithMiddleware, FetchError> {
        let client = match self.client.take() {
            Some(c) => c,
            None => {
                trace!("Building HTTP client");
                self.opts.build_client().map_err(FetchError::Build)?
            }
        };
        Ok(self.client.insert(client))
    }

    async fn wait_for_rate_limit(&self) {
        let Some(last) = self.last_request else {
            return;
        };
        let elapsed = last.elapsed();
        if elapsed < self.opts.request_delay {
            let wait = self.opts.request_delay - elapsed;
            trace!(?wait, "Rate limiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// GET the given URL and return the body as text
    pub async fn get(&mut self, url: &str) -> Result<String, FetchError> {
        self.wait_for_rate_limit().await;
        let res = self.send(url).await;
        self.last_request = Some(Instant::now());
        res
    }

    async fn send(&mut self, url: &str) -> Result<String, FetchError> {
        trace!(url, "Fetching URL...");
        let res = self
            .client()?
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.into(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.into(),
                status,
            });
        }

        res.text().await.map_err(|source| FetchError::Body {
            url: url.into(),
            source,
        })
    }
}
