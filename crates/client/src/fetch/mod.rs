//! HTTP fetch pipeline with bounded retries.
//!
//! ### Retries
//! - Every request gets `tries` attempts separated by a fixed delay.
//! - GET treats a non-success status as a failed attempt.
//! - HEAD reports the raw status and never follows redirects.
//! - Once the budget is spent the last error is returned unchanged.
//!
//! ### Identity & Session
//! - A desktop browser `User-Agent` is sent with every request.
//! - An optional cookie jar supplied at construction is shared by every
//!   request the fetcher issues, which is how a login sticks.

pub mod retry;
pub mod url;

use reqwest::Client;
use reqwest::cookie::Jar;
use std::sync::Arc;
use std::time::Duration;

pub use retry::{RetryPolicy, Sleeper, TokioSleeper, retry};
pub use url::{join, same_site, strip_query_param};

use fora_core::{AppConfig, Error, config::BROWSER_USER_AGENT};

/// Cookie store reused across every request of one fetcher.
pub type Session = Arc<Jar>;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: desktop Firefox)
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Attempts and inter-attempt delay (default: 3 tries, 1s apart)
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout: Duration::from_millis(20000),
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            retry: RetryPolicy { tries: config.tries, delay: config.retry_delay() },
        }
    }
}

/// The network operations site adapters need.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// GET a page and return its body.
    async fn get(&self, url: &str) -> Result<String, Error>;

    /// HEAD a URL without following redirects and return the status code.
    async fn head(&self, url: &str) -> Result<u16, Error>;

    /// POST an url-encoded form and return the response body.
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<String, Error>;

    /// Follow redirects from `url` and return where they end up.
    async fn resolve_redirect(&self, url: &str) -> Result<String, Error>;
}

/// HTTP client that retries every request a fixed number of times.
pub struct RetryingFetcher {
    http: Client,
    probe: Client,
    policy: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl RetryingFetcher {
    /// Create a fetcher without session state.
    pub fn new(config: &FetchConfig) -> Result<Self, Error> {
        Self::build(config, None)
    }

    /// Create a fetcher whose requests all share `session`.
    pub fn with_session(config: &FetchConfig, session: Session) -> Result<Self, Error> {
        Self::build(config, Some(session))
    }

    fn build(config: &FetchConfig, session: Option<Session>) -> Result<Self, Error> {
        let http = client_builder(config, session.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        let probe = client_builder(config, session)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, probe, policy: config.retry.clone(), sleeper: Box::new(TokioSleeper) })
    }
}

fn client_builder(config: &FetchConfig, session: Option<Session>) -> reqwest::ClientBuilder {
    let builder = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout)
        .use_rustls_tls()
        .gzip(true)
        .brotli(true)
        .deflate(true);

    match session {
        Some(jar) => builder.cookie_provider(jar),
        None => builder,
    }
}

#[async_trait::async_trait]
impl Transport for RetryingFetcher {
    async fn get(&self, url: &str) -> Result<String, Error> {
        let http = &self.http;
        retry(&self.policy, self.sleeper.as_ref(), url, move || async move {
            tracing::debug!("GET {}", url);
            let response = http
                .get(url)
                .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
                .send()
                .await
                .map_err(|e| Error::Network(format!("GET {}: {}", url, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::Network(format!("GET {}: status {}", url, status.as_u16())));
            }

            response
                .text()
                .await
                .map_err(|e| Error::Network(format!("GET {}: failed to read response: {}", url, e)))
        })
        .await
    }

    async fn head(&self, url: &str) -> Result<u16, Error> {
        let probe = &self.probe;
        retry(&self.policy, self.sleeper.as_ref(), url, move || async move {
            tracing::debug!("HEAD {}", url);
            let response = probe
                .head(url)
                .send()
                .await
                .map_err(|e| Error::Network(format!("HEAD {}: {}", url, e)))?;
            Ok(response.status().as_u16())
        })
        .await
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<String, Error> {
        let http = &self.http;
        retry(&self.policy, self.sleeper.as_ref(), url, move || async move {
            tracing::debug!("POST {}", url);
            let response = http
                .post(url)
                .form(form)
                .send()
                .await
                .map_err(|e| Error::Network(format!("POST {}: {}", url, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::Network(format!("POST {}: status {}", url, status.as_u16())));
            }

            response
                .text()
                .await
                .map_err(|e| Error::Network(format!("POST {}: failed to read response: {}", url, e)))
        })
        .await
    }

    async fn resolve_redirect(&self, url: &str) -> Result<String, Error> {
        let http = &self.http;
        retry(&self.policy, self.sleeper.as_ref(), url, move || async move {
            let response = http
                .head(url)
                .send()
                .await
                .map_err(|e| Error::Network(format!("HEAD {}: {}", url, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::Network(format!("HEAD {}: status {}", url, status.as_u16())));
            }

            tracing::debug!("{} resolved to {}", url, response.url());
            Ok(response.url().to_string())
        })
        .await
    }
}
