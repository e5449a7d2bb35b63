//! forums.nrvnqsr.com (vBulletin 4).

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use chrono::NaiveDateTime;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use fora_core::{Error, PageLocator, Post};

use super::{ThreadGetter, date_or_empty};
use crate::dates;
use crate::fetch::{Transport, join};
use crate::html::{Fragment, Rewrite, selector, text_of};

static SEED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(forums\.nrvnqsr\.com)/showthread\.php/(\d+)").expect("invalid regex")
});
static PAGE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/showthread\.php/\d+[^/?#]*/page(\d+)").expect("invalid regex"));
static POST_QUERY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?&]p=(\d+)").expect("invalid regex"));
static POST_ANCHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#post(\d+)").expect("invalid regex"));
static PAGE_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Page \d+ of (\d+)").expect("invalid regex"));

static POST: LazyLock<Selector> = LazyLock::new(|| selector("li.postcontainer"));
static POST_DATE: LazyLock<Selector> = LazyLock::new(|| selector("span.postdate"));
static SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span"));
static POST_COUNTER: LazyLock<Selector> = LazyLock::new(|| selector("a.postcounter"));
static USERNAME: LazyLock<Selector> = LazyLock::new(|| selector("a.username"));
static CONTENT: LazyLock<Selector> = LazyLock::new(|| selector("blockquote.postcontent"));
static POPUP: LazyLock<Selector> = LazyLock::new(|| selector("a.popupctrl"));
static QUOTE_CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector("div.bbcode_container"));
static DIV: LazyLock<Selector> = LazyLock::new(|| selector("div"));

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Adapter for vBulletin threads on forums.nrvnqsr.com.
pub struct BlGetter {
    url: String,
    base: String,
    thread_id: String,
    transport: Arc<dyn Transport>,
    /// "Today"/"Yesterday" are resolved against this clock.
    clock: fn() -> NaiveDateTime,
}

impl BlGetter {
    pub fn new(url: &str, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        let caps = SEED_URL
            .captures(url)
            .ok_or_else(|| Error::InvalidUrl(format!("not a vBulletin thread URL: {url}")))?;

        let scheme = caps.get(1).map_or("https://", |m| m.as_str());
        Ok(Self {
            url: url.to_string(),
            base: format!("{}{}", scheme, &caps[2]),
            thread_id: caps[3].to_string(),
            transport,
            clock: local_now,
        })
    }

    /// Replace the clock used for relative dates.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    fn absolute(&self, href: &str) -> Result<String, Error> {
        join(&format!("{}/", self.base), href)
    }

    fn parse_post(&self, item: ElementRef<'_>, page_url: &str) -> Result<Post, Error> {
        let counter = item
            .select(&POST_COUNTER)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| Error::missing("post counter link", page_url))?;

        let user = item.select(&USERNAME).next().ok_or_else(|| Error::missing("poster link", page_url))?;
        let poster_href = user.value().attr("href").ok_or_else(|| Error::missing("poster href", page_url))?;

        let body = item.select(&CONTENT).next().ok_or_else(|| Error::missing("post content", page_url))?;
        let orig_text = body.html();

        let now = (self.clock)();
        Ok(Post {
            poster_name: text_of(user),
            poster_url: self.absolute(poster_href)?,
            post_url: self.absolute(counter)?,
            text: self.process_html(&orig_text),
            orig_text,
            date: date_or_empty(page_url, || post_date(item, now)),
        })
    }
}

/// The date span reads `<day>, <span class="time">hh:mm AM</span>`, where
/// the day is a calendar date or one of `Today`/`Yesterday`.
fn post_date(item: ElementRef<'_>, now: NaiveDateTime) -> Option<String> {
    let date = item.select(&POST_DATE).next()?.select(&SPAN).next()?;
    let day = date.children().find_map(|node| node.value().as_text().map(|t| t.to_string()))?;
    let day = day.trim_end_matches([',', ' ', '\u{a0}']);
    let time = text_of(date.select(&SPAN).next()?);

    dates::resolve_relative(day, &time, now).map(dates::iso)
}

#[async_trait::async_trait]
impl ThreadGetter for BlGetter {
    fn name(&self) -> &'static str {
        "nrvnqsr"
    }

    fn seed_url(&self) -> &str {
        &self.url
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn get_posts(&self, page: &str, page_url: &str) -> Result<Vec<Post>, Error> {
        let document = Html::parse_document(page);
        document.select(&POST).map(|item| self.parse_post(item, page_url)).collect()
    }

    async fn get_npages(&self, first_page: &str) -> Result<u32, Error> {
        let document = Html::parse_document(first_page);
        let npages = document
            .select(&POPUP)
            .find_map(|popup| PAGE_LABEL.captures(&text_of(popup)).and_then(|caps| caps[1].parse().ok()));
        // No "Page X of Y" control means the thread fits on one page.
        Ok(npages.unwrap_or(1))
    }

    fn make_page_url(&self, locator: &PageLocator) -> Result<String, Error> {
        Ok(match locator {
            PageLocator::Number(n) => format!("{}/showthread.php/{}/page{}", self.base, self.thread_id, n),
            PageLocator::Token(token) => format!("{}/showthread.php?{}", self.base, token),
        })
    }

    /// `.../page4` maps to page 4. A `?p=<id>` permalink becomes the token
    /// `p=<id>`, which the forum answers with the page holding that post.
    fn get_url_page(&self, url: &str) -> Result<PageLocator, Error> {
        if let Some(caps) = PAGE_NUMBER.captures(url) {
            return caps[1]
                .parse()
                .map(PageLocator::Number)
                .map_err(|e| Error::InvalidUrl(format!("{url}: {e}")));
        }
        if let Some(caps) = POST_QUERY.captures(url) {
            return Ok(PageLocator::Token(format!("p={}", &caps[1])));
        }
        Ok(PageLocator::Number(1))
    }

    /// Flattens quote boxes: the two wrapper divs around a quote are dropped,
    /// the quote body becomes a `<blockquote>` and the icon widget at its top
    /// is removed.
    fn process_html(&self, raw: &str) -> String {
        let fragment = Fragment::parse(raw);

        let mut plan = HashMap::new();
        for container in fragment.html().select(&QUOTE_CONTAINER) {
            let Some(outer) = container.select(&DIV).next() else {
                continue;
            };
            let Some(quote) = outer.select(&DIV).next() else {
                continue;
            };
            plan.insert(container.id(), Rewrite::Unwrap);
            plan.insert(outer.id(), Rewrite::Unwrap);
            plan.insert(quote.id(), Rewrite::Rename("blockquote"));
            if let Some(widget) = quote.select(&DIV).next() {
                plan.insert(widget.id(), Rewrite::Drop);
            }
        }

        fragment.render(|el| plan.get(&el.id()).copied().unwrap_or(Rewrite::Keep))
    }

    fn post_id(&self, url: &str) -> Option<u64> {
        POST_QUERY.captures(url).or_else(|| POST_ANCHOR.captures(url)).and_then(|caps| caps[1].parse().ok())
    }
}
