//! Integration tests for Onion-Sieve
//!
//! The crawl tests drive the full crawler against an in-memory link graph;
//! the transport tests run the proxy transport against wiremock servers.

mod common;
mod crawl_tests;
mod savestate_tests;
mod transport_tests;
