//! Configuration module for webkeep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use webkeep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("webkeep.toml")).unwrap();
//! println!("{} crawler rules loaded", config.crawlers.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerRule, HttpConfig, RemoteServiceConfig, ServingConfig, StorageConfig,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
