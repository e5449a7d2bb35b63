//! In-memory transport for adapter tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use fora_core::Error;

use crate::fetch::Transport;

/// Serves canned pages and HEAD statuses, and records what was asked of it.
#[derive(Default)]
pub(crate) struct StubTransport {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
    statuses: Mutex<VecDeque<u16>>,
    requests: Mutex<Vec<String>>,
    forms: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl StubTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    pub(crate) fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// HEAD responses, handed out in order.
    pub(crate) fn statuses(self, statuses: &[u16]) -> Self {
        self.statuses.lock().unwrap().extend(statuses.iter().copied());
        self
    }

    /// Every request made so far, as `METHOD url`.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn gets(&self) -> usize {
        self.requests().iter().filter(|r| r.starts_with("GET ")).count()
    }

    pub(crate) fn forms(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.forms.lock().unwrap().clone()
    }

    fn record(&self, method: &str, url: &str) {
        self.requests.lock().unwrap().push(format!("{method} {url}"));
    }
}

#[async_trait::async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &str) -> Result<String, Error> {
        self.record("GET", url);
        self.pages.get(url).cloned().ok_or_else(|| Error::Network(format!("GET {url}: status 404")))
    }

    async fn head(&self, url: &str) -> Result<u16, Error> {
        self.record("HEAD", url);
        self.statuses.lock().unwrap().pop_front().ok_or_else(|| Error::Network(format!("HEAD {url}: no response")))
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<String, Error> {
        self.record("POST", url);
        let fields = form.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self.forms.lock().unwrap().push((url.to_string(), fields));
        self.pages.get(url).cloned().ok_or_else(|| Error::Network(format!("POST {url}: status 404")))
    }

    async fn resolve_redirect(&self, url: &str) -> Result<String, Error> {
        self.record("HEAD", url);
        Ok(self.redirects.get(url).cloned().unwrap_or_else(|| url.to_string()))
    }
}
