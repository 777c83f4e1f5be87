//! Integration tests for webkeep
//!
//! These tests use wiremock to stand in for web servers and the remote
//! scraping service, and run the full capture pipeline end-to-end.

mod capture_tests;
mod common;
mod remote_tests;
