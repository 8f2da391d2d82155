//! Portfolio content access
//!
//! This module composes the cache and the fetcher into a client for the
//! portfolio backend: profile, blog posts, projects and the contact form.

mod client;
mod models;

pub use client::{ContentClient, PROFILE_KEY, PROJECTS_KEY};
pub use models::{ContactMessage, Query, Snapshot};

use thiserror::Error;

use crate::cache::CacheError;
use crate::fetch::FetchError;

/// Errors surfaced to callers of the content client
#[derive(Debug, Error)]
pub enum ContentError {
    /// Nothing was cached and the backend could not be reached
    #[error(transparent)]
    Cache(#[from] CacheError<FetchError>),

    /// An uncached request failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The response is missing a field the caller relies on
    #[error("response has no `{0}` array")]
    MissingField(String),

    /// A contact submission failed local validation
    #[error("Invalid contact message: {0}")]
    InvalidContact(String),
}
