//! Crawler selection by URL pattern
//!
//! Rules are resolved once, when the dispatcher is built. Anything that would
//! make a rule unusable (a bad pattern, an unknown type tag, a remote crawler
//! with no API key) is logged and degraded at that point, so selection itself
//! cannot fail.

use crate::config::{Config, CrawlerRule, RemoteServiceConfig};
use crate::crawler::{Crawler, CrawlerKind, DefaultCrawler, RemoteServiceCrawler};
use crate::url::DomainPattern;
use crate::Result;

#[derive(Debug, Clone)]
struct DispatchRule {
    pattern: DomainPattern,
    kind: CrawlerKind,
}

/// Picks a crawler for a URL from an ordered rule list
#[derive(Debug, Clone)]
pub struct CrawlerDispatcher {
    rules: Vec<DispatchRule>,
    default: Crawler,
    remote: Option<Crawler>,
}

impl CrawlerDispatcher {
    /// Builds the dispatcher and its crawlers from configuration
    ///
    /// The remote crawler is only built when some rule asks for it. When the
    /// `[remote-service]` table is absent its defaults are used, so an API key
    /// in the environment is enough.
    pub fn from_config(config: &Config) -> Result<Self> {
        let default = DefaultCrawler::new(&config.http)?;

        let wants_remote = config
            .crawlers
            .iter()
            .any(|rule| CrawlerKind::from_tag(&rule.crawler_type) == Some(CrawlerKind::RemoteService));

        let remote = if wants_remote {
            let remote_config = config.remote_service.clone().unwrap_or_default();
            build_remote(&remote_config, config)
        } else {
            None
        };

        Ok(Self::new(default, remote, &config.crawlers))
    }

    /// Resolves `rules` against the crawlers that are available
    pub fn new(
        default: DefaultCrawler,
        remote: Option<RemoteServiceCrawler>,
        rules: &[CrawlerRule],
    ) -> Self {
        let remote = remote.map(Crawler::RemoteService);
        let rules = rules
            .iter()
            .filter_map(|rule| resolve_rule(rule, remote.is_some()))
            .collect();

        Self {
            rules,
            default: Crawler::Default(default),
            remote,
        }
    }

    /// The crawler kind the first matching rule selects, or Default
    pub fn kind_for(&self, url: &str) -> CrawlerKind {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(url))
            .map(|rule| rule.kind)
            .unwrap_or(CrawlerKind::Default)
    }

    /// Selects the crawler for `url`
    pub fn select(&self, url: &str) -> &Crawler {
        match self.kind_for(url) {
            CrawlerKind::RemoteService => self.remote.as_ref().unwrap_or(&self.default),
            CrawlerKind::Default => &self.default,
        }
    }

    /// The resolved rules, in match order
    pub fn rules(&self) -> impl Iterator<Item = (&str, CrawlerKind)> + '_ {
        self.rules.iter().map(|rule| (rule.pattern.glob(), rule.kind))
    }
}

fn build_remote(remote_config: &RemoteServiceConfig, config: &Config) -> Option<RemoteServiceCrawler> {
    match RemoteServiceCrawler::new(remote_config, &config.http) {
        Ok(crawler) => Some(crawler),
        Err(e) => {
            tracing::warn!("Remote crawler unavailable, using default instead: {}", e);
            None
        }
    }
}

fn resolve_rule(rule: &CrawlerRule, remote_available: bool) -> Option<DispatchRule> {
    let pattern = match DomainPattern::compile(&rule.domain) {
        Ok(pattern) => pattern,
        Err(e) => {
            tracing::warn!("Skipping crawler rule: {}", e);
            return None;
        }
    };

    let kind = match CrawlerKind::from_tag(&rule.crawler_type) {
        Some(CrawlerKind::RemoteService) if !remote_available => {
            tracing::warn!(
                "Crawler rule {} wants the remote crawler, which is unavailable; using default",
                rule.domain
            );
            CrawlerKind::Default
        }
        Some(kind) => kind,
        None => {
            tracing::warn!(
                "Unknown crawler type {:?} for {}; using default",
                rule.crawler_type,
                rule.domain
            );
            CrawlerKind::Default
        }
    };

    Some(DispatchRule { pattern, kind })
}
