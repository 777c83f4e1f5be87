//! HTML parser for page metadata and reference resolution
//!
//! This module handles reading a fetched page:
//! - Page title (`<title>`, then the first `<h1>`)
//! - Image sources in document order
//! - Links, resolved to absolute URLs
//! - Rewriting `<a href>` and `<img src>` to absolute form before conversion

use crate::url::resolve_reference;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{Html, Selector};
use url::Url;

/// Title used when a page has neither `<title>` nor `<h1>`
pub const UNTITLED: &str = "Untitled";

/// `href` of an `<a>` or `src` of an `<img>` start tag
///
/// Earlier attribute values are consumed whole, so a quoted `>` or ` src=`
/// inside them is never mistaken for the attribute itself.
static TAG_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)(?P<prefix><(?:a\b(?:[^>"']|"[^"]*"|'[^']*')*?\shref|img\b(?:[^>"']|"[^"]*"|'[^']*')*?\ssrc)\s*=\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<bare>[^\s"'>]+))"#,
    )
    .expect("tag reference regex is valid")
});

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// `<title>`, else the first `<h1>`, else "Untitled"
    pub title: String,

    /// `<img src>` values as written, in document order, duplicates kept
    pub image_urls: Vec<String>,

    /// `<a href>` targets, resolved against the page URL
    pub links: Vec<String>,
}

/// Parses HTML content and extracts the title, images and links
///
/// Parsing is lenient; malformed markup never fails.
///
/// # Example
///
/// ```
/// use webkeep::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><img src="a.png"><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/post").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.image_urls, vec!["a.png"]);
/// assert_eq!(parsed.links, vec!["https://example.com/page"]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document).unwrap_or_else(|| UNTITLED.to_string()),
        image_urls: extract_image_sources(&document),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        document
            .select(&selector)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

fn extract_image_sources(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string)
        .collect()
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL
///
/// Returns None for fragment-only links, `javascript:`/`mailto:`/`tel:`/`data:`
/// targets and anything that is not HTTP(S) after resolution.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}

/// Rewrites every `<a href>` and `<img src>` in the raw HTML to absolute form
///
/// Values that are already absolute (or `data:`) are left as they are. The
/// rewritten attribute is always double-quoted.
pub fn absolutize_references(html: &str, base_url: &Url) -> String {
    TAG_REFERENCE
        .replace_all(html, |caps: &Captures<'_>| {
            let prefix = &caps["prefix"];
            let value = caps
                .name("dq")
                .or_else(|| caps.name("sq"))
                .or_else(|| caps.name("bare"))
                .map(|m| m.as_str())
                .unwrap_or_default();

            let resolved = if value.trim_start().starts_with('#') {
                value.to_string()
            } else {
                resolve_reference(value, Some(base_url)).unwrap_or_else(|| value.to_string())
            };
            format!("{}\"{}\"", prefix, resolved.replace('"', "&quot;"))
        })
        .into_owned()
}
