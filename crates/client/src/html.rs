//! HTML helpers built on scraper.
//!
//! scraper's tree is read-only, so markup is "edited" by serializing it back
//! out while a rule decides, per element, whether to keep, rename, unwrap or
//! drop it.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// What to do with one element while serializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    Keep,
    /// Keep attributes and children under a different tag name.
    Rename(&'static str),
    /// Emit the children in place of the element.
    Unwrap,
    /// Emit nothing for the element or its subtree.
    Drop,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// A parsed HTML fragment.
pub struct Fragment {
    html: Html,
}

impl Fragment {
    pub fn parse(markup: &str) -> Self {
        Self { html: Html::parse_fragment(markup) }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Serialize the fragment, applying `rule` to every element.
    pub fn render(&self, rule: impl Fn(ElementRef<'_>) -> Rewrite) -> String {
        let mut out = String::new();
        write_children(self.html.root_element(), &rule, &mut out);
        out
    }
}

fn write_children(element: ElementRef<'_>, rule: &dyn Fn(ElementRef<'_>) -> Rewrite, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            write_element(child_element, rule, out);
            continue;
        }
        match child.value() {
            Node::Text(text) => out.push_str(&html_escape::encode_text(&**text)),
            Node::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, rule: &dyn Fn(ElementRef<'_>) -> Rewrite, out: &mut String) {
    let name = match rule(element) {
        Rewrite::Drop => return,
        Rewrite::Unwrap => {
            write_children(element, rule, out);
            return;
        }
        Rewrite::Rename(name) => name,
        Rewrite::Keep => element.value().name(),
    };

    out.push('<');
    out.push_str(name);
    for (attr, value) in element.value().attrs() {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    write_children(element, rule, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Compile a selector known at compile time.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("invalid selector")
}

/// All text beneath `element`, whitespace-collapsed.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}
