use crate::ConfigError;
use regex::Regex;

/// A compiled crawler domain glob
///
/// `*` matches any run of characters; every other character, dots included,
/// matches literally. The pattern is searched anywhere in the full URL, so
/// `example.com` matches `https://example.com/post` and `*.medium.com`
/// matches `https://blog.medium.com/x`.
#[derive(Debug, Clone)]
pub struct DomainPattern {
    glob: String,
    regex: Regex,
}

impl DomainPattern {
    /// Compiles a domain glob
    ///
    /// # Examples
    ///
    /// ```
    /// use webkeep::url::DomainPattern;
    ///
    /// let pattern = DomainPattern::compile("*.example.com").unwrap();
    /// assert!(pattern.is_match("https://blog.example.com/post"));
    /// assert!(!pattern.is_match("https://example.org/"));
    /// ```
    pub fn compile(glob: &str) -> Result<Self, ConfigError> {
        let glob = glob.trim();
        if glob.is_empty() {
            return Err(ConfigError::InvalidPattern(
                "Domain pattern cannot be empty".to_string(),
            ));
        }

        let regex = Regex::new(&glob_to_regex(glob))
            .map_err(|e| ConfigError::InvalidPattern(format!("{}: {}", glob, e)))?;

        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    /// The glob this pattern was compiled from
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// Returns true if the pattern occurs anywhere in `url`
    pub fn is_match(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}

/// Translates a domain glob into an unanchored regular expression
pub fn glob_to_regex(glob: &str) -> String {
    regex::escape(glob).replace(r"\*", ".*")
}
