//! Chapter listings harvested from table-of-contents posts.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};

use fora_core::{ChapterReference, Error};

use crate::fetch::{Transport, join};
use crate::html::{selector, text_of};

static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

/// Collect the links of a contents post, resolving relative URLs against the
/// post's URL and dropping duplicates (by resolved URL).
pub fn extract_references(html: &str, base_url: &str) -> Vec<ChapterReference> {
    let document = Html::parse_fragment(html);

    let mut seen = HashSet::new();
    let mut references = Vec::new();

    for element in document.select(&LINK) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(url) = join(base_url, href) else {
            tracing::debug!("skipping unresolvable link {:?}", href);
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        let title = text_of(element);
        let title = if title.is_empty() { "[link]".to_string() } else { title };
        references.push(ChapterReference { title, url });
    }

    references
}

/// Build a chapter listing from a contents post.
///
/// With a transport, every link is followed through its redirects so that
/// short links and thread-relative links end up in the forum's canonical
/// permalink form.
pub async fn make_listing(
    html: &str,
    base_url: &str,
    canonicalize: Option<&dyn Transport>,
) -> Result<Vec<ChapterReference>, Error> {
    let mut references = extract_references(html, base_url);
    let Some(transport) = canonicalize else {
        return Ok(references);
    };

    let total = references.len();
    for (n, reference) in references.iter_mut().enumerate() {
        reference.url = transport.resolve_redirect(&reference.url).await?;
        tracing::debug!("canonicalized link {}/{}: {}", n + 1, total, reference.url);
    }
    Ok(references)
}
