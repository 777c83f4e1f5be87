use crate::{UrlError, UrlResult};
use url::Url;

/// Resolves a link or image reference to its absolute form
///
/// # Resolution Rules
///
/// 1. Surrounding whitespace is trimmed; an empty reference yields `None`
/// 2. `data:` URLs are kept as they are
/// 3. Protocol-relative references (`//host/path`) are prefixed with `https:`
/// 4. References that already carry a scheme are kept as they are
/// 5. Everything else is joined onto `base` with standard relative-URL
///    resolution; without a base the reference is returned unchanged
///
/// Extraction, outbound rewriting and downloading all go through this one
/// function so that every spelling of the same image ends up comparing equal.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webkeep::url::resolve_reference;
///
/// let base = Url::parse("https://example.com/blog/post").unwrap();
/// assert_eq!(
///     resolve_reference("//cdn.example.com/a.png", Some(&base)).as_deref(),
///     Some("https://cdn.example.com/a.png")
/// );
/// assert_eq!(
///     resolve_reference("../img/b.png", Some(&base)).as_deref(),
///     Some("https://example.com/img/b.png")
/// );
/// ```
pub fn resolve_reference(reference: &str, base: Option<&Url>) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    if reference
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
    {
        return Some(reference.to_string());
    }

    if reference.starts_with("//") {
        return Some(format!("https:{}", reference));
    }

    if has_scheme(reference) {
        return Some(reference.to_string());
    }

    match base {
        Some(base) => base.join(reference).ok().map(|url| url.to_string()),
        None => Some(reference.to_string()),
    }
}

/// Returns true if the reference starts with a URL scheme such as `https:`
fn has_scheme(reference: &str) -> bool {
    match reference.find(':') {
        Some(idx) if idx > 0 => {
            let scheme = &reference[..idx];
            scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Parses a page URL that is about to be fetched
///
/// Only HTTP(S) URLs with a host are accepted.
pub fn parse_page_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}
