//! Thread data model.
//!
//! Posts and threads are fetch-scoped: every call that acquires a thread
//! builds them from scratch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single forum post, normalized across sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub poster_name: String,
    pub poster_url: String,
    /// Canonical permalink; stable across independent fetches of the thread.
    pub post_url: String,
    /// Post body with site chrome stripped.
    pub text: String,
    /// Post body exactly as extracted from the page.
    pub orig_text: String,
    /// ISO-8601 timestamp, or empty when the site's date could not be read.
    pub date: String,
}

/// Posts of a thread in the order the site lists them.
///
/// Append-only: pages are concatenated, never re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thread {
    posts: Vec<Post>,
}

impl Thread {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one page worth of posts.
    pub fn extend_page(&mut self, page: Vec<Post>) {
        self.posts.extend(page);
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl From<Vec<Post>> for Thread {
    fn from(posts: Vec<Post>) -> Self {
        Self { posts }
    }
}

/// Identifies one page of a thread.
///
/// Numbers are 1-indexed as the site displays them; tokens are opaque
/// site-specific URL components that each adapter knows how to plug back in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageLocator {
    Number(u32),
    Token(String),
}

impl fmt::Display for PageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageLocator::Number(n) => write!(f, "{n}"),
            PageLocator::Token(t) => f.write_str(t),
        }
    }
}

impl From<u32> for PageLocator {
    fn from(n: u32) -> Self {
        PageLocator::Number(n)
    }
}

/// Which pages of a thread to acquire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Every page, 1 through the discovered page count.
    #[default]
    All,
    One(PageLocator),
    Many(Vec<PageLocator>),
}

impl PageSelection {
    /// Expand into concrete locators, given the thread's page count.
    pub fn locators(&self, npages: u32) -> Vec<PageLocator> {
        match self {
            PageSelection::All => (1..=npages).map(PageLocator::Number).collect(),
            PageSelection::One(locator) => vec![locator.clone()],
            PageSelection::Many(locators) => locators.clone(),
        }
    }
}

/// Externally curated pointer to a chapter post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterReference {
    pub title: String,
    pub url: String,
}

impl ChapterReference {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into() }
    }
}

/// A resolved chapter: the reference's title plus the post's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub text: String,
}
