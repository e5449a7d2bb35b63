//! fanfiction.net forums.
//!
//! The forum pager is rendered inconsistently enough that the page count is
//! not read from markup. Instead the visible pager links give a lower bound
//! and HEAD requests walk forward from there until the site redirects, which
//! it does for any page past the end.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use fora_core::{Error, PageLocator, Post};

use super::{ThreadGetter, date_or_empty};
use crate::dates;
use crate::fetch::{Transport, join};
use crate::html::{selector, text_of};

const ORIGIN: &str = "https://www.fanfiction.net";

static SEED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.|m\.)?fanfiction\.net/topic/(\d+)/(\d+)").expect("invalid regex")
});
static TOPIC_PAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/topic/\d+/\d+/(\d+)").expect("invalid regex"));
static POST_ANCHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#p(\d+)$").expect("invalid regex"));

static PAGER_LINK: LazyLock<Selector> = LazyLock::new(|| selector("center a[href]"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("table#gui_table2i td"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static XDATE: LazyLock<Selector> = LazyLock::new(|| selector("span.xdate"));

/// Adapter for fanfiction.net forum topics.
pub struct FfnGetter {
    url: String,
    forum_id: String,
    topic_id: String,
    transport: Arc<dyn Transport>,
}

impl FfnGetter {
    pub fn new(url: &str, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        let caps = SEED_URL
            .captures(url)
            .ok_or_else(|| Error::InvalidUrl(format!("not a fanfiction.net topic URL: {url}")))?;

        Ok(Self { url: url.to_string(), forum_id: caps[1].to_string(), topic_id: caps[2].to_string(), transport })
    }

    fn parse_post(&self, cell: ElementRef<'_>, page_url: &str) -> Result<Post, Error> {
        let anchor = cell.select(&ANCHOR).next().ok_or_else(|| Error::missing("poster link", page_url))?;
        let href = anchor.value().attr("href").ok_or_else(|| Error::missing("poster href", page_url))?;
        let anchor_id = anchor.value().id().ok_or_else(|| Error::missing("post anchor id", page_url))?;

        let orig_text = body_after(anchor);

        Ok(Post {
            poster_name: text_of(anchor),
            poster_url: join(&format!("{ORIGIN}/"), href)?,
            post_url: format!("{page_url}#{anchor_id}"),
            text: self.process_html(&orig_text),
            orig_text,
            date: date_or_empty(page_url, || post_date(cell)),
        })
    }
}

/// Post bodies are loose nodes after the poster link, ended by the date span.
/// Bare text runs become paragraphs and elements are kept as they are.
fn body_after(anchor: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in anchor.next_siblings() {
        if let Some(run) = node.value().as_text() {
            let run = run.trim();
            if !run.is_empty() {
                text.push_str(&format!("<p>{}</p>\n", html_escape::encode_text(run)));
            }
            continue;
        }
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if element.value().name() == "span" {
            break;
        }
        text.push_str(&element.html());
        text.push('\n');
    }
    text
}

fn post_date(cell: ElementRef<'_>) -> Option<String> {
    let xdate = cell.select(&XDATE).next()?;
    xdate
        .value()
        .attr("title")
        .and_then(dates::parse_loose)
        .or_else(|| xdate.value().attr("data-xutime")?.parse().ok().and_then(dates::from_unix))
        .map(dates::iso)
}

/// Highest page number linked from the pager, at least 1.
fn visible_page_bound(page: &str) -> u32 {
    let document = Html::parse_document(page);
    document
        .select(&PAGER_LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| TOPIC_PAGE.captures(href).and_then(|caps| caps[1].parse().ok()))
        .max()
        .unwrap_or(1)
        .max(1)
}

#[async_trait::async_trait]
impl ThreadGetter for FfnGetter {
    fn name(&self) -> &'static str {
        "fanfiction.net"
    }

    fn seed_url(&self) -> &str {
        &self.url
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn get_posts(&self, page: &str, page_url: &str) -> Result<Vec<Post>, Error> {
        let document = Html::parse_document(page);
        document.select(&CELL).map(|cell| self.parse_post(cell, page_url)).collect()
    }

    async fn get_npages(&self, first_page: &str) -> Result<u32, Error> {
        let mut probe = visible_page_bound(first_page);
        loop {
            let url = self.make_page_url(&PageLocator::Number(probe))?;
            match self.transport.head(&url).await? {
                200 => probe += 1,
                301 | 302 | 303 | 307 | 308 => {
                    tracing::debug!("{} redirected; last page is {}", url, probe - 1);
                    return Ok(probe - 1);
                }
                status => return Err(Error::Protocol(format!("HEAD {url}: unexpected status {status}"))),
            }
        }
    }

    fn make_page_url(&self, locator: &PageLocator) -> Result<String, Error> {
        Ok(format!("{ORIGIN}/topic/{}/{}/{}", self.forum_id, self.topic_id, locator))
    }

    fn get_url_page(&self, url: &str) -> Result<PageLocator, Error> {
        match TOPIC_PAGE.captures(url) {
            Some(caps) => {
                caps[1].parse().map(PageLocator::Number).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))
            }
            None => Ok(PageLocator::Number(1)),
        }
    }

    /// Post anchors are `p<id>`.
    fn post_id(&self, url: &str) -> Option<u64> {
        POST_ANCHOR.captures(url).and_then(|caps| caps[1].parse().ok())
    }
}
