use url::Url;

/// Extracts the directory segment that identifies a URL's host
///
/// The host is lowercased. An explicit, non-default port is appended with an
/// underscore so that two servers on the same host never share a directory.
/// IPv6 literals lose their brackets and have `:` mapped to `_`, keeping the
/// segment a plain file name.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use webkeep::url::host_segment;
///
/// let url = Url::parse("https://Example.COM/path").unwrap();
/// assert_eq!(host_segment(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(host_segment(&url), Some("127.0.0.1_8080".to_string()));
/// ```
pub fn host_segment(url: &Url) -> Option<String> {
    let host = url
        .host_str()?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .replace(':', "_")
        .to_lowercase();
    if host.is_empty() {
        return None;
    }

    Some(match url.port() {
        Some(port) => format!("{}_{}", host, port),
        None => host,
    })
}
