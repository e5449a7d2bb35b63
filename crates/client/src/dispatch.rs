//! Adapter selection by URL.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use fora_core::Error;

use crate::fetch::{FetchConfig, Transport};
use crate::sites::{SiteKind, ThreadGetter};

/// Ordered routing table; the first matching pattern wins.
static ROUTES: LazyLock<Vec<(Regex, SiteKind)>> = LazyLock::new(|| {
    [
        (r"^(https?://)?forums\.spacebattles\.com/", SiteKind::Xf),
        (r"^(https?://)?forums\.sufficientvelocity\.com/", SiteKind::Xf),
        (r"^(https?://)?forums\.nrvnqsr\.com/", SiteKind::Bl),
        (r"^(https?://)?(www\.)?questionablequesting\.com/", SiteKind::Qq),
        (r"^(https?://)?(www\.|m\.)?fanfiction\.net/topic/", SiteKind::Ffn),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).expect("invalid regex"), kind))
    .collect()
});

/// Builds the right [`ThreadGetter`] for a thread URL.
pub struct Dispatcher {
    config: FetchConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl Dispatcher {
    /// Each getter gets its own fetcher built from `config`.
    pub fn new(config: FetchConfig) -> Self {
        Self { config, transport: None }
    }

    /// Every getter shares `transport`.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { config: FetchConfig::default(), transport: Some(transport) }
    }

    /// Site family handling `url`, if any.
    pub fn select(&self, url: &str) -> Option<SiteKind> {
        ROUTES.iter().find(|(pattern, _)| pattern.is_match(url)).map(|(_, kind)| *kind)
    }

    /// A getter for `url`, or `None` when no adapter handles it.
    pub fn make_getter(&self, url: &str) -> Result<Option<Box<dyn ThreadGetter>>, Error> {
        let Some(kind) = self.select(url) else {
            tracing::debug!("no adapter matches {}", url);
            return Ok(None);
        };

        let getter = match &self.transport {
            Some(transport) => kind.build_with(url, Arc::clone(transport))?,
            None => kind.build(url, &self.config)?,
        };
        tracing::debug!("{} handled by the {} adapter", url, getter.name());
        Ok(Some(getter))
    }
}
