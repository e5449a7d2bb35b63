//! Per-site thread adapters.
//!
//! ### Contract
//! Every supported forum implements [`ThreadGetter`]: how to find the posts
//! on a page, how many pages a thread has, how to address a page and how to
//! clean a post's markup. Acquiring a thread is the same everywhere and is
//! provided by [`ThreadGetter::get_thread`].
//!
//! ### Failure policy
//! - A missing structural element (post list, permalink, pager label) is a
//!   `Parse` error and aborts the page.
//! - A date that cannot be read becomes an empty string; the post is kept.
//! - Any page failing aborts the whole thread; nothing fetched so far is
//!   returned.

pub mod bl;
pub mod ffn;
pub mod qq;
pub mod tvt;
pub mod xf;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use fora_core::{Error, PageLocator, PageSelection, Post, Thread};

use crate::fetch::{FetchConfig, RetryingFetcher, Session, Transport};

pub use bl::BlGetter;
pub use ffn::FfnGetter;
pub use qq::QqGetter;
pub use tvt::TvtGetter;
pub use xf::XfGetter;

/// Capabilities a forum adapter provides.
#[async_trait::async_trait]
pub trait ThreadGetter: Send + Sync {
    /// Short site name for logs.
    fn name(&self) -> &'static str;

    /// URL the adapter was built from.
    fn seed_url(&self) -> &str;

    /// Network access used for every request this adapter makes.
    fn transport(&self) -> &dyn Transport;

    /// Extract the posts on one page, in page order.
    fn get_posts(&self, page: &str, page_url: &str) -> Result<Vec<Post>, Error>;

    /// Total number of pages, judged from the first page fetched.
    async fn get_npages(&self, first_page: &str) -> Result<u32, Error>;

    /// Absolute URL of the page `locator` names.
    fn make_page_url(&self, locator: &PageLocator) -> Result<String, Error>;

    /// Locator of the page `url` points at.
    fn get_url_page(&self, url: &str) -> Result<PageLocator, Error>;

    /// Rewrite a post body so it renders without the site's CSS and scripts.
    fn process_html(&self, raw: &str) -> String {
        raw.to_string()
    }

    /// Numeric id of the post a permalink points at, for matching permalinks
    /// whose shapes differ.
    fn post_id(&self, _url: &str) -> Option<u64> {
        None
    }

    /// Authenticate the adapter's session.
    async fn login(&self, _username: &str, _password: &str) -> Result<(), Error> {
        Err(Error::Unsupported(format!("{} has no login", self.name())))
    }

    /// Download the selected pages of the thread and concatenate their posts.
    async fn get_thread(&self, pages: &PageSelection) -> Result<Thread, Error> {
        let first = self.transport().get(self.seed_url()).await?;
        let npages = self.get_npages(&first).await?;
        tracing::info!("{}: {} has {} pages", self.name(), self.seed_url(), npages);

        let mut thread = Thread::new();
        for locator in pages.locators(npages) {
            let page_url = self.make_page_url(&locator)?;
            let markup = self.transport().get(&page_url).await?;
            thread.extend_page(self.get_posts(&markup, &page_url)?);
            tracing::info!("got page {} of {}", locator, npages);
        }

        Ok(thread)
    }
}

/// Forum software families with a working adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    Xf,
    Bl,
    Qq,
    Ffn,
}

impl SiteKind {
    /// Whether threads on this site are only readable after `login`.
    pub fn requires_login(self) -> bool {
        matches!(self, SiteKind::Qq)
    }

    /// Build the adapter for `url`, creating its own fetcher.
    ///
    /// QQ gets a fresh cookie session so that a later `login` carries over
    /// to the page requests.
    pub fn build(self, url: &str, config: &FetchConfig) -> Result<Box<dyn ThreadGetter>, Error> {
        let fetcher = match self {
            SiteKind::Qq => RetryingFetcher::with_session(config, Session::default())?,
            _ => RetryingFetcher::new(config)?,
        };
        self.build_with(url, Arc::new(fetcher))
    }

    /// Build the adapter for `url` on top of an existing transport.
    pub fn build_with(self, url: &str, transport: Arc<dyn Transport>) -> Result<Box<dyn ThreadGetter>, Error> {
        Ok(match self {
            SiteKind::Xf => Box::new(XfGetter::new(url, transport)?),
            SiteKind::Bl => Box::new(BlGetter::new(url, transport)?),
            SiteKind::Qq => Box::new(QqGetter::new(url, transport)?),
            SiteKind::Ffn => Box::new(FfnGetter::new(url, transport)?),
        })
    }
}

/// Parse a date with `parse`, logging and returning an empty string when it
/// cannot be read.
pub(crate) fn date_or_empty(page_url: &str, parse: impl FnOnce() -> Option<String>) -> String {
    match parse() {
        Some(date) => date,
        None => {
            tracing::warn!("unreadable post date on {}; leaving it empty", page_url);
            String::new()
        }
    }
}
