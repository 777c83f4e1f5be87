//! URL handling module for webkeep
//!
//! This module provides reference resolution (the one rule every image and
//! link goes through), host segment extraction for storage paths, and the
//! glob matcher used by crawler rules.

mod domain;
mod matcher;
mod resolve;

pub use domain::host_segment;
pub use matcher::{glob_to_regex, DomainPattern};
pub use resolve::{parse_page_url, resolve_reference};
