//! Image reference extraction and Markdown rewriting
//!
//! Every operation here runs on the same single-pass grammar over the
//! Markdown text. A scan yields `(span, url)` pairs, and rewriting replaces
//! exactly those spans, so an image URL that also appears as plain text, or
//! inside an ordinary link, is never touched.

use crate::url::resolve_reference;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use url::Url;

/// Prefix of image paths produced by the downloader, relative to `content.md`
pub const LOCAL_IMAGES_MARKER: &str = "images/";

/// Serving route used when none is configured
pub const DEFAULT_SERVING_ROUTE: &str = "/files";

const IMAGE_GRAMMAR: &str = r#"(?m)(?P<inline>!\[(?:[^\]\\\n]|\\.)*\]\([ \t]*(?:<(?P<inline_angle>[^>\n]*)>|(?P<inline_url>(?:[^\s()]|\([^\s()]*\))+))(?:[ \t]+(?:"[^"\n]*"|'[^'\n]*'|\([^)\n]*\)))?[ \t]*\))|(?P<refimg>!\[(?P<ref_alt>(?:[^\]\\\n]|\\.)*)\]\[(?P<ref_label>[^\]\n]*)\])|(?P<def>^[ ]{0,3}\[(?P<def_label>[^\]\n]+)\]:[ \t]*(?:<(?P<def_angle>[^>\n]*)>|(?P<def_url>\S+)))"#;

/// Which piece of image syntax a reference came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `![alt](url "title")`
    Inline,
    /// `[label]: url "title"` whose label is used by a `![alt][label]` image
    Definition,
}

/// One image URL found in Markdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Byte range of the URL inside the scanned text
    pub span: Range<usize>,
    /// The URL exactly as written
    pub url: String,
    pub kind: ReferenceKind,
}

/// Finds image references and rewrites them between remote and local form
///
/// The extractor holds only compiled patterns and the serving route; it is
/// cheap to clone and safe to share between pipelines.
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    grammar: Regex,
    img_selector: Selector,
    serving_route: String,
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageExtractor {
    pub fn new() -> Self {
        Self {
            grammar: Regex::new(IMAGE_GRAMMAR).expect("image grammar is a valid regex"),
            img_selector: Selector::parse("img[src]").expect("img selector is valid"),
            serving_route: DEFAULT_SERVING_ROUTE.to_string(),
        }
    }

    /// Sets the route prefix used by [`restore_markdown_images`](Self::restore_markdown_images)
    pub fn with_serving_route(mut self, route: &str) -> Self {
        self.serving_route = route.trim_end_matches('/').to_string();
        self
    }

    /// Scans Markdown for image references, in document order
    ///
    /// Inline images contribute their URL directly. Reference-style images
    /// (`![alt][label]`, `![alt][]`) contribute the URL of the matching
    /// `[label]: url` definition; labels compare case-insensitively.
    /// Definitions that no image uses are ordinary links and are skipped.
    pub fn scan(&self, markdown: &str) -> Vec<ImageReference> {
        let mut references = Vec::new();
        let mut image_labels = HashSet::new();
        let mut definitions = Vec::new();

        for caps in self.grammar.captures_iter(markdown) {
            if caps.name("inline").is_some() {
                if let Some(url) = caps.name("inline_angle").or_else(|| caps.name("inline_url")) {
                    references.push(ImageReference {
                        span: url.range(),
                        url: url.as_str().to_string(),
                        kind: ReferenceKind::Inline,
                    });
                }
            } else if caps.name("refimg").is_some() {
                let label = caps.name("ref_label").map_or("", |m| m.as_str());
                let label = if label.trim().is_empty() {
                    caps.name("ref_alt").map_or("", |m| m.as_str())
                } else {
                    label
                };
                image_labels.insert(normalize_label(label));
            } else if let Some(label) = caps.name("def_label") {
                if let Some(url) = caps.name("def_angle").or_else(|| caps.name("def_url")) {
                    definitions.push((normalize_label(label.as_str()), url));
                }
            }
        }

        references.extend(
            definitions
                .into_iter()
                .filter(|(label, _)| image_labels.contains(label))
                .map(|(_, url)| ImageReference {
                    span: url.range(),
                    url: url.as_str().to_string(),
                    kind: ReferenceKind::Definition,
                }),
        );
        references.sort_by_key(|reference| reference.span.start);
        references
    }

    /// Extracts the set of absolute image URLs referenced by Markdown
    pub fn extract_from_markdown(&self, content: &str, base_url: Option<&Url>) -> HashSet<String> {
        self.scan(content)
            .iter()
            .filter_map(|reference| resolve_reference(&reference.url, base_url))
            .collect()
    }

    /// Extracts the set of absolute image URLs from `<img src>` elements
    pub fn extract_from_html(&self, document: &Html, base_url: Option<&Url>) -> HashSet<String> {
        document
            .select(&self.img_selector)
            .filter_map(|img| img.value().attr("src"))
            .filter_map(|src| resolve_reference(src, base_url))
            .collect()
    }

    /// Replaces remote image URLs with local paths
    ///
    /// Both the mapping keys and each URL found in the Markdown are resolved
    /// against `base_url` before comparison, so `/a.png`, `./a.png` and
    /// `https://example.com/a.png` all hit the same entry. Only the URL span
    /// is replaced; alt text and titles survive. Images missing from the
    /// mapping keep their remote URL.
    pub fn replace_markdown_images(
        &self,
        markdown: &str,
        url_to_local_path: &HashMap<String, String>,
        base_url: Option<&Url>,
    ) -> String {
        let by_absolute: HashMap<String, &str> = url_to_local_path
            .iter()
            .filter_map(|(url, local)| {
                resolve_reference(url, base_url).map(|absolute| (absolute, local.as_str()))
            })
            .collect();

        self.rewrite(markdown, |url| {
            resolve_reference(url, base_url)
                .and_then(|absolute| by_absolute.get(&absolute).map(|local| local.to_string()))
        })
    }

    /// Turns local image paths into servable URLs for display
    ///
    /// `images/abc.png` becomes `<route>/<storage_relative_dir>/images/abc.png`.
    /// Only paths that still start with the local-images marker are touched,
    /// which makes a second application a no-op.
    pub fn restore_markdown_images(&self, markdown: &str, storage_relative_dir: &str) -> String {
        let dir = storage_relative_dir.trim_matches('/');
        let prefix = if dir.is_empty() {
            format!("{}/", self.serving_route)
        } else {
            format!("{}/{}/", self.serving_route, dir)
        };

        self.rewrite(markdown, |url| {
            if url.starts_with(&prefix) {
                return None;
            }
            let local = url.strip_prefix("./").unwrap_or(url);
            local
                .starts_with(LOCAL_IMAGES_MARKER)
                .then(|| format!("{}{}", prefix, local))
        })
    }

    /// Applies `replacement` to every image URL span, leaving all other text intact
    fn rewrite<F>(&self, markdown: &str, mut replacement: F) -> String
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut output = String::with_capacity(markdown.len());
        let mut last = 0;

        for reference in self.scan(markdown) {
            if let Some(new_url) = replacement(&reference.url) {
                output.push_str(&markdown[last..reference.span.start]);
                output.push_str(&new_url);
                last = reference.span.end;
            }
        }

        output.push_str(&markdown[last..]);
        output
    }
}

fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
