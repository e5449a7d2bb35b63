//! TV Tropes forum threads.
//!
//! Only the page count can be read so far; the dispatcher does not route
//! any URL here.

use std::sync::{Arc, LazyLock};

use scraper::{Html, Selector};

use fora_core::{Error, PageLocator, Post};

use super::ThreadGetter;
use crate::fetch::Transport;
use crate::html::{selector, text_of};

static PAGE_BUTTON: LazyLock<Selector> = LazyLock::new(|| selector("a.forumpagebutton"));

pub struct TvtGetter {
    url: String,
    transport: Arc<dyn Transport>,
}

impl TvtGetter {
    pub fn new(url: &str, transport: Arc<dyn Transport>) -> Self {
        Self { url: url.to_string(), transport }
    }

    fn unsupported(&self, what: &str) -> Error {
        Error::Unsupported(format!("{}: {what} is not implemented", self.name()))
    }
}

#[async_trait::async_trait]
impl ThreadGetter for TvtGetter {
    fn name(&self) -> &'static str {
        "tvtropes"
    }

    fn seed_url(&self) -> &str {
        &self.url
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn get_posts(&self, _page: &str, _page_url: &str) -> Result<Vec<Post>, Error> {
        Err(self.unsupported("post extraction"))
    }

    /// The last page button carries the page count.
    async fn get_npages(&self, first_page: &str) -> Result<u32, Error> {
        let document = Html::parse_document(first_page);
        let last = document.select(&PAGE_BUTTON).last().ok_or_else(|| Error::missing("page buttons", &self.url))?;
        let label = text_of(last);
        label.parse().map_err(|_| Error::Parse(format!("page button {label:?} is not numeric")))
    }

    fn make_page_url(&self, _locator: &PageLocator) -> Result<String, Error> {
        Err(self.unsupported("page addressing"))
    }

    fn get_url_page(&self, _url: &str) -> Result<PageLocator, Error> {
        Err(self.unsupported("page addressing"))
    }
}
