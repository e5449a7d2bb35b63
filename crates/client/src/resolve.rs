//! Turning chapter references into chapter texts.
//!
//! References are resolved in order against one cached thread page. A
//! reference that misses triggers exactly one reload of the page it points
//! into; if it still misses, resolution fails rather than looping.

use fora_core::{AppConfig, Chapter, ChapterReference, Error, PageSelection, Post, Thread};

use crate::dispatch::Dispatcher;
use crate::fetch::{FetchConfig, same_site};
use crate::sites::ThreadGetter;

/// Where the resolver loads threads from.
#[async_trait::async_trait]
pub trait ThreadSource: Send {
    /// Fetch the thread page that `url` points into.
    async fn load(&mut self, url: &str) -> Result<Thread, Error>;

    /// Site-specific numeric id of the post `url` names, used when the
    /// same post is linked through differently shaped permalinks.
    fn post_id(&self, _url: &str) -> Option<u64> {
        None
    }
}

/// Production source: picks an adapter per URL, logs in where the site
/// needs it and fetches the single page the URL points into.
pub struct DispatchingSource {
    dispatcher: Dispatcher,
    credentials: Option<(String, String)>,
    current: Option<Box<dyn ThreadGetter>>,
}

impl DispatchingSource {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher, credentials: None, current: None }
    }

    /// Build from application config, picking up QQ credentials if set.
    pub fn from_config(config: &AppConfig) -> Self {
        let source = Self::new(Dispatcher::new(FetchConfig::from(config)));
        match config.qq_credentials() {
            Some((username, password)) => source.with_credentials(username, password),
            None => source,
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some((username.to_string(), password.to_string()));
        self
    }
}

#[async_trait::async_trait]
impl ThreadSource for DispatchingSource {
    async fn load(&mut self, url: &str) -> Result<Thread, Error> {
        let kind = self.dispatcher.select(url).ok_or_else(|| Error::Unsupported(format!("no adapter for {url}")))?;
        let getter =
            self.dispatcher.make_getter(url)?.ok_or_else(|| Error::Unsupported(format!("no adapter for {url}")))?;

        if kind.requires_login() {
            match &self.credentials {
                Some((username, password)) => getter.login(username, password).await?,
                None => tracing::warn!("{} needs a login but no credentials are configured", getter.name()),
            }
        }

        let locator = getter.get_url_page(url)?;
        tracing::info!("loading page {} of {}", locator, url);
        let thread = getter.get_thread(&PageSelection::One(locator)).await?;

        self.current = Some(getter);
        Ok(thread)
    }

    fn post_id(&self, url: &str) -> Option<u64> {
        self.current.as_ref().and_then(|getter| getter.post_id(url))
    }
}

/// Resolves chapter references against a cached thread, reloading on miss.
pub struct ChapterResolver<S> {
    source: S,
    thread: Thread,
    loaded_from: Option<String>,
}

impl<S: ThreadSource> ChapterResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source, thread: Thread::new(), loaded_from: None }
    }

    /// URL of the reference that caused the current thread to be loaded.
    pub fn loaded_from(&self) -> Option<&str> {
        self.loaded_from.as_deref()
    }

    /// Resolve every reference in order into a chapter.
    pub async fn resolve(&mut self, references: &[ChapterReference]) -> Result<Vec<Chapter>, Error> {
        let mut chapters = Vec::with_capacity(references.len());
        for reference in references {
            let text = match self.find(&reference.url) {
                Some(post) => post.text.clone(),
                None => {
                    self.reload(&reference.url).await?;
                    self.find(&reference.url)
                        .map(|post| post.text.clone())
                        .ok_or_else(|| Error::UnresolvedReference { url: reference.url.clone() })?
                }
            };
            tracing::debug!("resolved {:?}", reference.title);
            chapters.push(Chapter { title: reference.title.clone(), text });
        }
        Ok(chapters)
    }

    async fn reload(&mut self, url: &str) -> Result<(), Error> {
        self.thread = self.source.load(url).await?;
        self.loaded_from = Some(url.to_string());
        Ok(())
    }

    /// A post matches on its exact permalink, or on an equal post id when
    /// both URLs are on the same site; forums sharing an adapter number
    /// their posts independently.
    fn find(&self, url: &str) -> Option<&Post> {
        let wanted = self.source.post_id(url);
        self.thread.posts().iter().find(|post| {
            post.post_url == url
                || (wanted.is_some()
                    && self.source.post_id(&post.post_url) == wanted
                    && same_site(url, &post.post_url))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::sites::testing::StubTransport;

    /// Serves fixed threads keyed by URL and counts loads.
    #[derive(Default)]
    struct CountingSource {
        threads: HashMap<String, Thread>,
        loads: Vec<String>,
    }

    impl CountingSource {
        fn thread(mut self, url: &str, post_urls: &[&str]) -> Self {
            let posts = post_urls
                .iter()
                .map(|post_url| Post {
                    poster_name: "A".into(),
                    poster_url: "u".into(),
                    post_url: post_url.to_string(),
                    text: format!("text of {post_url}"),
                    orig_text: String::new(),
                    date: String::new(),
                })
                .collect::<Vec<_>>();
            self.threads.insert(url.to_string(), Thread::from(posts));
            self
        }
    }

    #[async_trait::async_trait]
    impl ThreadSource for CountingSource {
        async fn load(&mut self, url: &str) -> Result<Thread, Error> {
            self.loads.push(url.to_string());
            Ok(self.threads.get(url).cloned().unwrap_or_default())
        }

        fn post_id(&self, url: &str) -> Option<u64> {
            url.rsplit_once("post-").and_then(|(_, id)| id.parse().ok())
        }
    }

    #[tokio::test]
    async fn test_same_page_references_load_once() {
        let source = CountingSource::default().thread("t/p1#post-1", &["t/p1#post-1", "t/p1#post-2"]);
        let mut resolver = ChapterResolver::new(source);

        let chapters = resolver
            .resolve(&[ChapterReference::new("One", "t/p1#post-1"), ChapterReference::new("Two", "t/p1#post-2")])
            .await
            .unwrap();

        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0], Chapter { title: "One".into(), text: "text of t/p1#post-1".into() });
        assert_eq!(chapters[1].text, "text of t/p1#post-2");
        assert_eq!(resolver.source.loads, vec!["t/p1#post-1"]);
    }

    #[tokio::test]
    async fn test_hits_do_not_load() {
        let source = CountingSource::default().thread("t/p1#post-1", &["t/p1#post-1", "t/p1#post-2"]);
        let mut resolver = ChapterResolver::new(source);
        resolver.resolve(&[ChapterReference::new("One", "t/p1#post-1")]).await.unwrap();

        resolver
            .resolve(&[ChapterReference::new("Two", "t/p1#post-2"), ChapterReference::new("One", "t/p1#post-1")])
            .await
            .unwrap();
        assert_eq!(resolver.source.loads.len(), 1);
    }

    #[tokio::test]
    async fn test_cross_thread_reference_reloads_once() {
        let source = CountingSource::default()
            .thread("a/p1#post-1", &["a/p1#post-1"])
            .thread("b/p3#post-9", &["b/p3#post-9"]);
        let mut resolver = ChapterResolver::new(source);

        let chapters = resolver
            .resolve(&[ChapterReference::new("A", "a/p1#post-1"), ChapterReference::new("B", "b/p3#post-9")])
            .await
            .unwrap();

        assert_eq!(chapters[1].text, "text of b/p3#post-9");
        assert_eq!(resolver.source.loads, vec!["a/p1#post-1", "b/p3#post-9"]);
        assert_eq!(resolver.loaded_from(), Some("b/p3#post-9"));
    }

    #[tokio::test]
    async fn test_second_miss_is_unresolved() {
        let source = CountingSource::default().thread("a/p1#post-1", &["a/p1#post-2"]);
        let mut resolver = ChapterResolver::new(source);

        let result = resolver.resolve(&[ChapterReference::new("A", "a/p1#post-1")]).await;

        assert_eq!(result, Err(Error::UnresolvedReference { url: "a/p1#post-1".into() }));
        assert_eq!(resolver.source.loads.len(), 1);
    }

    #[tokio::test]
    async fn test_matches_by_post_id() {
        let source = CountingSource::default().thread("a/p1?view=full#post-7", &["a/posts/post-7"]);
        let mut resolver = ChapterResolver::new(source);

        let chapters = resolver.resolve(&[ChapterReference::new("A", "a/p1?view=full#post-7")]).await.unwrap();
        assert_eq!(chapters[0].text, "text of a/posts/post-7");
    }

    #[tokio::test]
    async fn test_load_failure_propagates() {
        struct FailingSource;

        #[async_trait::async_trait]
        impl ThreadSource for FailingSource {
            async fn load(&mut self, url: &str) -> Result<Thread, Error> {
                Err(Error::Network(format!("GET {url}: status 503")))
            }
        }

        let mut resolver = ChapterResolver::new(FailingSource);
        let result = resolver.resolve(&[ChapterReference::new("A", "x")]).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }

    const XF_PAGE: &str = r#"
        <span class="pageNavHeader">Page 2 of 2</span>
        <li class="message">
            <a class="username" href="members/a.1/">A</a>
            <blockquote class="messageText">Chapter two</blockquote>
            <a title="Permalink" href="posts/77/">#21</a>
        </li>
    "#;

    #[tokio::test]
    async fn test_dispatching_source_fetches_referenced_page() {
        let reference = "https://forums.spacebattles.com/threads/story.42/page-2#post-77";
        let transport = Arc::new(
            StubTransport::new()
                .page(reference, XF_PAGE)
                .page("https://forums.spacebattles.com/threads/42/page-2", XF_PAGE),
        );
        let source = DispatchingSource::new(Dispatcher::with_transport(transport.clone()));
        let mut resolver = ChapterResolver::new(source);

        let chapters = resolver.resolve(&[ChapterReference::new("Two", reference)]).await.unwrap();

        assert_eq!(chapters[0].text, r#"<div class="messageText">Chapter two</div>"#);
        assert_eq!(
            transport.requests(),
            vec![format!("GET {reference}"), "GET https://forums.spacebattles.com/threads/42/page-2".to_string()]
        );
    }

    fn xf_page(body: &str) -> String {
        format!(
            r#"<li class="message">
                <a class="username" href="members/a.1/">A</a>
                <blockquote class="messageText">{body}</blockquote>
                <a title="Permalink" href="posts/100/">#1</a>
            </li>"#
        )
    }

    #[tokio::test]
    async fn test_same_post_id_on_another_forum_reloads() {
        let spacebattles = "https://forums.spacebattles.com/threads/a.1/page-1#post-100";
        let sufficient_velocity = "https://forums.sufficientvelocity.com/threads/b.2/page-1#post-100";
        let transport = Arc::new(
            StubTransport::new()
                .page(spacebattles, &xf_page("SB"))
                .page("https://forums.spacebattles.com/threads/1/page-1", &xf_page("SB"))
                .page(sufficient_velocity, &xf_page("SV"))
                .page("https://forums.sufficientvelocity.com/threads/2/page-1", &xf_page("SV")),
        );
        let mut resolver = ChapterResolver::new(DispatchingSource::new(Dispatcher::with_transport(transport.clone())));

        let chapters = resolver
            .resolve(&[ChapterReference::new("One", spacebattles), ChapterReference::new("Two", sufficient_velocity)])
            .await
            .unwrap();

        assert_eq!(chapters[0].text, r#"<div class="messageText">SB</div>"#);
        assert_eq!(chapters[1].text, r#"<div class="messageText">SV</div>"#);
        assert_eq!(transport.gets(), 4);
        assert_eq!(resolver.loaded_from(), Some(sufficient_velocity));
    }

    #[tokio::test]
    async fn test_fanfiction_reference_in_another_shape_resolves() {
        let reference = "http://m.fanfiction.net/topic/123/456/7/#p700";
        let page = r#"
            <center><a href="/topic/123/456/7/">7</a></center>
            <table id="gui_table2i"><tbody><tr><td>
                <a href="/u/9/Writer" id="p700">Writer</a> Chapter seven <span class="xdate" data-xutime="1388934245">x</span>
            </td></tr></tbody></table>
        "#;
        let transport = Arc::new(
            StubTransport::new()
                .page(reference, page)
                .page("https://www.fanfiction.net/topic/123/456/7", page)
                .statuses(&[200, 302]),
        );
        let mut resolver = ChapterResolver::new(DispatchingSource::new(Dispatcher::with_transport(transport.clone())));

        let chapters = resolver.resolve(&[ChapterReference::new("Seven", reference)]).await.unwrap();

        assert_eq!(chapters[0].text, "<p>Chapter seven</p>\n");
        assert_eq!(transport.gets(), 2);
    }

    #[tokio::test]
    async fn test_dispatching_source_unsupported_url() {
        let mut source = DispatchingSource::new(Dispatcher::with_transport(Arc::new(StubTransport::new())));
        assert!(matches!(source.load("https://example.com/").await, Err(Error::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_dispatching_source_logs_in_for_qq() {
        let seed = "http://questionablequesting.com/index.php?topic=42.msg1001#msg1001";
        let page = r#"
            <div class="pagelinks">[<strong>1</strong>]</div>
            <div class="post_wrapper">
                <div class="poster"><h4><a href="http://questionablequesting.com/index.php?action=profile">A</a></h4></div>
                <h5 id="subject_1001"><a href="http://questionablequesting.com/index.php?topic=42.msg1001#msg1001">C1</a></h5>
                <div class="inner" id="msg_1001">Text</div>
            </div>
        "#;
        let transport = Arc::new(
            StubTransport::new()
                .page(
                    "http://questionablequesting.com/index.php?action=login",
                    r#"<form id="frmLogin" onsubmit="h(this, 'tok');"></form>"#,
                )
                .page("http://questionablequesting.com/index.php?action=login2", "<html>ok</html>")
                .page(seed, page)
                .page("http://questionablequesting.com/index.php?topic=42.msg1001", page),
        );
        let source =
            DispatchingSource::new(Dispatcher::with_transport(transport.clone())).with_credentials("alice", "pw");
        let mut resolver = ChapterResolver::new(source);

        let chapters = resolver.resolve(&[ChapterReference::new("C1", seed)]).await.unwrap();

        assert_eq!(chapters[0].text, r#"<div class="inner" id="msg_1001">Text</div>"#);
        assert_eq!(transport.forms().len(), 1);
        assert_eq!(transport.requests()[0], "GET http://questionablequesting.com/index.php?action=login");
    }
}
