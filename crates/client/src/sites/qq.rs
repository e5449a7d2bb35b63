//! questionablequesting.com (SMF).
//!
//! Threads are only readable with a logged-in session, so the adapter is
//! built on a fetcher carrying its own cookie jar and [`QqGetter::login`]
//! must run before the first page request. When a request arrives without
//! cookies, SMF appends a `PHPSESSID` query parameter to every link on the
//! page; it is stripped before a link is stored.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use sha1::{Digest, Sha1};

use fora_core::{Error, PageLocator, Post};

use super::{ThreadGetter, date_or_empty};
use crate::dates;
use crate::fetch::{Transport, strip_query_param};
use crate::html::{selector, text_of};

/// SMF's default number of posts per page.
const POSTS_PER_PAGE: u32 = 50;

static TOPIC_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(?:www\.)?questionablequesting\.com/index\.php\?topic=(\d+)(?:\.([^#&;]+))?")
        .expect("invalid regex")
});
static SUBJECT_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^subject_(\d+)$").expect("invalid regex"));
static MSG_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"msg(\d+)").expect("invalid regex"));
static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'([^']+)'").expect("invalid regex"));

static WRAPPER: LazyLock<Selector> = LazyLock::new(|| selector("div.post_wrapper"));
static SUBJECT: LazyLock<Selector> = LazyLock::new(|| selector(r#"h5[id^="subject_"]"#));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static INNER: LazyLock<Selector> = LazyLock::new(|| selector("div.inner"));
static POSTER: LazyLock<Selector> = LazyLock::new(|| selector("div.poster h4 a"));
static DATE_LABEL: LazyLock<Selector> = LazyLock::new(|| selector("div.smalltext strong"));
static CURRENT_PAGE: LazyLock<Selector> = LazyLock::new(|| selector("div.pagelinks strong"));
static NAV_PAGE: LazyLock<Selector> = LazyLock::new(|| selector("a.navPages"));
static LOGIN_FORM: LazyLock<Selector> = LazyLock::new(|| selector("form#frmLogin"));

/// Comparison key for a QQ URL: the same link with any session id removed.
pub fn desessionize(url: &str) -> String {
    strip_query_param(url, "PHPSESSID")
}

fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// SMF's client-side password hash: the password never leaves the browser,
/// only a digest salted with the per-session token does.
pub fn hash_password(username: &str, password: &str, token: &str) -> String {
    let inner = sha1_hex(&format!("{}{}", username.to_lowercase(), password));
    sha1_hex(&format!("{inner}{token}"))
}

/// Per-session token quoted inside the login form's `onsubmit` handler.
fn login_token(page: &str) -> Result<String, Error> {
    let document = Html::parse_document(page);
    let onsubmit = document
        .select(&LOGIN_FORM)
        .next()
        .and_then(|form| form.value().attr("onsubmit"))
        .ok_or_else(|| Error::Protocol("login page has no frmLogin form".into()))?;

    QUOTED
        .captures(onsubmit)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| Error::Protocol("login form carries no session token".into()))
}

fn has_login_form(page: &str) -> bool {
    Html::parse_document(page).select(&LOGIN_FORM).next().is_some()
}

/// Adapter for SMF topics on questionablequesting.com.
pub struct QqGetter {
    url: String,
    origin: String,
    topic_id: String,
    transport: Arc<dyn Transport>,
}

impl QqGetter {
    pub fn new(url: &str, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        let url = desessionize(url);
        let caps = TOPIC_URL
            .captures(&url)
            .ok_or_else(|| Error::InvalidUrl(format!("not a questionablequesting topic URL: {url}")))?;

        let scheme = caps.get(1).map_or("https://", |m| m.as_str());
        let origin = format!("{scheme}questionablequesting.com");
        let topic_id = caps[2].to_string();
        Ok(Self { url, origin, topic_id, transport })
    }

    fn parse_post(&self, wrapper: ElementRef<'_>, page_url: &str) -> Result<Post, Error> {
        let subject = wrapper.select(&SUBJECT).next().ok_or_else(|| Error::missing("post subject", page_url))?;
        let permalink = subject
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| Error::missing("post permalink", page_url))?;
        let msg_id = subject
            .value()
            .id()
            .and_then(|id| SUBJECT_ID.captures(id))
            .map(|caps| format!("msg_{}", &caps[1]))
            .ok_or_else(|| Error::missing("post id", page_url))?;

        let body = wrapper
            .select(&INNER)
            .find(|div| div.value().id() == Some(msg_id.as_str()))
            .ok_or_else(|| Error::missing("post body", page_url))?;
        let orig_text = body.html();

        let poster = wrapper.select(&POSTER).next().ok_or_else(|| Error::missing("poster link", page_url))?;
        let poster_href = poster.value().attr("href").ok_or_else(|| Error::missing("poster href", page_url))?;

        Ok(Post {
            poster_name: text_of(poster),
            poster_url: desessionize(poster_href),
            post_url: desessionize(permalink),
            text: self.process_html(&orig_text),
            orig_text,
            date: date_or_empty(page_url, || post_date(wrapper)),
        })
    }
}

/// The header reads `« <strong>Reply #3 on:</strong> January 05, 2014, 03:04:05 PM »`.
fn post_date(wrapper: ElementRef<'_>) -> Option<String> {
    let label = wrapper.select(&DATE_LABEL).next()?;
    let stamp = label.next_siblings().find_map(|node| node.value().as_text().map(|t| t.to_string()))?;
    let stamp = stamp.trim_matches([' ', '\u{a0}', '«', '»', '\n', '\t']);
    dates::parse_loose(stamp).map(dates::iso)
}

fn page_number(element: ElementRef<'_>) -> Result<u32, Error> {
    let label = text_of(element);
    label.parse().map_err(|_| Error::Parse(format!("page number {label:?} is not numeric")))
}

#[async_trait::async_trait]
impl ThreadGetter for QqGetter {
    fn name(&self) -> &'static str {
        "questionablequesting"
    }

    fn seed_url(&self) -> &str {
        &self.url
    }

    fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    fn get_posts(&self, page: &str, page_url: &str) -> Result<Vec<Post>, Error> {
        let document = Html::parse_document(page);
        document.select(&WRAPPER).map(|wrapper| self.parse_post(wrapper, page_url)).collect()
    }

    async fn get_npages(&self, first_page: &str) -> Result<u32, Error> {
        let document = Html::parse_document(first_page);
        let current = document.select(&CURRENT_PAGE).next().map(page_number).transpose()?.unwrap_or(1);
        let last = document.select(&NAV_PAGE).last().map(page_number).transpose()?.unwrap_or(1);
        Ok(current.max(last))
    }

    /// Page n starts at post offset (n - 1) * 50; tokens such as `msg1234`
    /// are passed through for SMF to resolve.
    fn make_page_url(&self, locator: &PageLocator) -> Result<String, Error> {
        let start = match locator {
            PageLocator::Number(n) => (n.saturating_sub(1) * POSTS_PER_PAGE).to_string(),
            PageLocator::Token(token) => token.clone(),
        };
        Ok(format!("{}/index.php?topic={}.{}", self.origin, self.topic_id, start))
    }

    fn get_url_page(&self, url: &str) -> Result<PageLocator, Error> {
        let url = desessionize(url);
        let caps = TOPIC_URL
            .captures(&url)
            .ok_or_else(|| Error::InvalidUrl(format!("not a questionablequesting topic URL: {url}")))?;

        Ok(match caps.get(3).map(|m| m.as_str()) {
            None => PageLocator::Number(1),
            Some(start) => match start.parse::<u32>() {
                Ok(offset) if offset % POSTS_PER_PAGE == 0 => PageLocator::Number(offset / POSTS_PER_PAGE + 1),
                _ => PageLocator::Token(start.to_string()),
            },
        })
    }

    fn post_id(&self, url: &str) -> Option<u64> {
        MSG_ID.captures(url).and_then(|caps| caps[1].parse().ok())
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), Error> {
        let form_page = self.transport.get(&format!("{}/index.php?action=login", self.origin)).await?;
        let token = login_token(&form_page)?;
        let hash = hash_password(username, password, &token);

        let form = [("user", username), ("passwrd", ""), ("cookieneverexp", "on"), ("hash_passwrd", hash.as_str())];
        let reply = self.transport.post_form(&format!("{}/index.php?action=login2", self.origin), &form).await?;
        if has_login_form(&reply) {
            return Err(Error::Protocol(format!("login as {username} was rejected")));
        }

        tracing::info!("logged in to {} as {}", self.origin, username);
        Ok(())
    }
}
