//! XenForo forums (SpaceBattles, Sufficient Velocity).
//!
//! The site's own pager label is trusted for the page count. Dates come from
//! the `data-time` epoch on recent posts and from a human-readable `title`
//! on older ones.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use fora_core::{Error, PageLocator, Post};

use super::{ThreadGetter, date_or_empty};
use crate::dates;
use crate::fetch::{Transport, join};
use crate::html::{Fragment, Rewrite, selector, text_of};

static SEED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(https?://)?([^/]+)/threads/(?:[^/]*\.)?(\d+)").expect("invalid regex"));
static PAGE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:https?://)?[^/]+/threads/[^/]+/?(?:page-(\d+))?").expect("invalid regex"));
static POST_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:/posts/|#post-)(\d+)").expect("invalid regex"));
static PAGE_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Page \d+ of (\d+)").expect("invalid regex"));

static MESSAGE: LazyLock<Selector> = LazyLock::new(|| selector("li.message"));
static USERNAME: LazyLock<Selector> = LazyLock::new(|| selector("a.username"));
static MESSAGE_TEXT: LazyLock<Selector> = LazyLock::new(|| selector("blockquote.messageText"));
static PERMALINK: LazyLock<Selector> = LazyLock::new(|| selector(r#"a[title="Permalink"]"#));
static DATE_TIME: LazyLock<Selector> = LazyLock::new(|| selector(".DateTime"));
static PAGE_NAV: LazyLock<Selector> = LazyLock::new(|| selector("span.pageNavHeader"));

/// Adapter for XenForo 1.x threads.
pub struct XfGetter {
    url: String,
    /// Scheme and host, e.g. `https://forums.spacebattles.com`.
    base: String,
    thread_id: String,
    transport: Arc<dyn Transport>,
}

impl XfGetter {
    pub fn new(url: &str, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        let caps = SEED_URL
            .captures(url)
            .ok_or_else(|| Error::InvalidUrl(format!("not a XenForo thread URL: {url}")))?;

        let scheme = caps.get(1).map_or("https://", |m| m.as_str());
        let base = format!("{}{}", scheme, &caps[2]);

        Ok(Self { url: url.to_string(), base, thread_id: caps[3].to_string(), transport })
    }

    fn absolute(&self, href: &str) -> Result<String, Error> {
        join(&format!("{}/", self.base), href)
    }

    fn parse_post(&self, message: ElementRef<'_>, page_url: &str) -> Result<Post, Error> {
        let user = message.select(&USERNAME).next().ok_or_else(|| Error::missing("poster link", page_url))?;
        let poster_href = user.value().attr("href").ok_or_else(|| Error::missing("poster href", page_url))?;

        let body = message.select(&MESSAGE_TEXT).next().ok_or_else(|| Error::missing("message text", page_url))?;
        let orig_text = body.html();

        let permalink = message
            .select(&PERMALINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| Error::missing("permalink", page_url))?;

        Ok(Post {
            poster_name: text_of(user),
            poster_url: self.absolute(poster_href)?,
            post_url: self.absolute(permalink)?,
            text: self.process_html(&orig_text),
            orig_text,
            date: date_or_empty(page_url, || message_date(message)),
        })
    }
}

fn message_date(message: ElementRef<'_>) -> Option<String> {
    let element = message.select(&DATE_TIME).next()?;
    let datetime = match element.value().name() {
        "abbr" => dates::from_unix(element.value().attr("data-time")?.trim().parse().ok()?)?,
        "span" => dates::parse_loose(element.value().attr("title")?)?,
        _ => return None,
    };
    Some(dates::iso(datetime))
}

#[async_trait::async_trait]
impl ThreadGetter for XfGetter {
    fn name(&self) -> &'static str {
        "xenforo"
    }

    fn seed_url(&self) -> &str {
        &self.url
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn get_posts(&self, page: &str, page_url: &str) -> Result<Vec<Post>, Error> {
        let document = Html::parse_document(page);
        document.select(&MESSAGE).map(|message| self.parse_post(message, page_url)).collect()
    }

    async fn get_npages(&self, first_page: &str) -> Result<u32, Error> {
        let document = Html::parse_document(first_page);

        // Single-page threads carry no pager at all.
        let Some(label) = document.select(&PAGE_NAV).next() else {
            return Ok(1);
        };

        let label = text_of(label);
        PAGE_LABEL
            .captures(&label)
            .and_then(|caps| caps[1].parse().ok())
            .ok_or_else(|| Error::Parse(format!("unrecognized page label {label:?} on {}", self.url)))
    }

    fn make_page_url(&self, locator: &PageLocator) -> Result<String, Error> {
        let page = match locator {
            PageLocator::Number(n) => format!("page-{n}"),
            PageLocator::Token(token) => token.clone(),
        };
        Ok(format!("{}/threads/{}/{}", self.base, self.thread_id, page))
    }

    fn get_url_page(&self, url: &str) -> Result<PageLocator, Error> {
        let caps = PAGE_URL.captures(url).ok_or_else(|| Error::InvalidUrl(format!("not a XenForo page URL: {url}")))?;
        match caps.get(1) {
            Some(n) => n
                .as_str()
                .parse()
                .map(PageLocator::Number)
                .map_err(|e| Error::InvalidUrl(format!("{url}: {e}"))),
            None => Ok(PageLocator::Number(1)),
        }
    }

    fn process_html(&self, raw: &str) -> String {
        Fragment::parse(raw).render(|el| {
            if el.value().name() == "blockquote" && el.value().classes().any(|c| c == "messageText") {
                Rewrite::Rename("div")
            } else {
                Rewrite::Keep
            }
        })
    }

    fn post_id(&self, url: &str) -> Option<u64> {
        POST_ID.captures(url).and_then(|caps| caps[1].parse().ok())
    }
}
