//! HTML to Markdown conversion and cleanup

use crate::{Result, WebkeepError};
use htmd::options::{CodeBlockStyle, Options};
use htmd::HtmlToMarkdown;
use once_cell::sync::Lazy;
use regex::Regex;

/// Opening fence with a language hint, e.g. "```  Rust "
static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)```[ \t]*(?P<lang>[A-Za-z0-9_+#.\-]+)[ \t]*$")
        .expect("fence regex is valid")
});

/// Unordered list item marker
static BULLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<indent>[ \t]*)[-+*][ \t]+").expect("bullet regex is valid")
});

static EXTRA_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank line regex is valid"));

/// Converts a page to Markdown
///
/// `<script>` and `<style>` contents are dropped and `<pre>` blocks become
/// fenced code. Links and images are kept with whatever URLs the HTML
/// carries; callers absolutize them first.
pub fn html_to_markdown(html: &str, url: &str) -> Result<String> {
    let converter = HtmlToMarkdown::builder()
        .options(Options {
            code_block_style: CodeBlockStyle::Fenced,
            ..Default::default()
        })
        .skip_tags(vec!["script", "style", "noscript"])
        .build();

    let markdown = converter.convert(html).map_err(|e| WebkeepError::HtmlParse {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    Ok(post_process_markdown(&markdown))
}

/// Cleans up converted Markdown
///
/// - Fence language hints are trimmed and lowercased
/// - List bullets become `* `, indentation kept
/// - Runs of blank lines collapse to one
/// - Leading and trailing whitespace is trimmed
///
/// Lines inside fenced code blocks are left alone.
pub fn post_process_markdown(content: &str) -> String {
    let mut in_fence = false;
    let mut lines = Vec::new();

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            if in_fence {
                lines.push(line.to_string());
            } else {
                lines.push(
                    FENCE_OPEN
                        .replace(line, |caps: &regex::Captures<'_>| {
                            format!("{}```{}", &caps["indent"], caps["lang"].to_lowercase())
                        })
                        .into_owned(),
                );
            }
            in_fence = !in_fence;
            continue;
        }

        if in_fence {
            lines.push(line.to_string());
        } else {
            lines.push(BULLET.replace(line, "${indent}* ").into_owned());
        }
    }

    let joined = lines.join("\n");
    EXTRA_BLANK_LINES
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}
