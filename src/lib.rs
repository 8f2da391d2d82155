//! folio library
//!
//! Reads portfolio content from a remote API through a TTL cache with stale
//! fallback and a retrying, validating fetch helper. The modules are exposed
//! for the `folio` binary and for integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod content;
pub mod fetch;
pub mod report;
