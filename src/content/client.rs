//! Content API client
//!
//! Fetches profile, blog and project documents from the portfolio backend.
//! Read endpoints go through the TTL cache so repeated lookups within the
//! freshness window cost nothing, and keep working on stale data while the
//! backend is down.

use serde_json::Value;

use super::models::{ContactMessage, Query, Snapshot};
use super::ContentError;
use crate::cache::TtlCache;
use crate::fetch::{FetchError, Fetcher, RequestOptions, RetryPolicy};

const PROFILE_PATH: &str = "/api/profile";
const PROJECTS_PATH: &str = "/api/projects";
const BLOG_PATH: &str = "/api/blog";
const BLOG_DETAILED_PATH: &str = "/api/blog/detailed";
const CONTACT_PATH: &str = "/api/contact";

/// Cache key for the profile document
pub const PROFILE_KEY: &str = "profile";
/// Cache key for the project list
pub const PROJECTS_KEY: &str = "projects";

/// Client for the portfolio content API
#[derive(Debug, Clone)]
pub struct ContentClient {
    base_url: String,
    fetcher: Fetcher,
    cache: TtlCache,
}

impl ContentClient {
    /// Creates a client for the API at `base_url`
    ///
    /// A trailing `/` on `base_url` is ignored.
    pub fn new(base_url: impl Into<String>, fetcher: Fetcher, cache: TtlCache) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            fetcher,
            cache,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Reads `path` through the cache under `key`
    async fn cached(&self, key: &str, path: &str) -> Result<Value, ContentError> {
        let url = self.url(path);
        let value = self
            .cache
            .get_or_fetch(key, || async {
                self.fetcher
                    .fetch_json::<Value>(&url, &RequestOptions::get())
                    .await
            })
            .await?;
        Ok(value)
    }

    /// Fetches the profile document
    pub async fn profile(&self) -> Result<Value, ContentError> {
        self.cached(PROFILE_KEY, PROFILE_PATH).await
    }

    /// Fetches the project list
    pub async fn projects(&self) -> Result<Value, ContentError> {
        self.cached(PROJECTS_KEY, PROJECTS_PATH).await
    }

    /// Fetches a page of blog posts
    ///
    /// Each distinct query is cached separately under `blog?<query>`.
    pub async fn blog_posts(&self, query: &Query) -> Result<Value, ContentError> {
        let search = query.to_search();
        let key = format!("blog{}", search);
        self.cached(&key, &format!("{}{}", BLOG_PATH, search)).await
    }

    /// Fetches detailed blog posts, bypassing the cache
    pub async fn blog_detailed(&self, query: &Query) -> Result<Value, ContentError> {
        let url = self.url(&format!("{}{}", BLOG_DETAILED_PATH, query.to_search()));
        Ok(self.fetcher.fetch_json(&url, &RequestOptions::get()).await?)
    }

    /// Returns the blog entries embedded in the profile document
    ///
    /// The profile is refetched with a longer backoff if it arrives without
    /// any blogs, which the backend occasionally does while warming up. The
    /// request is root-relative, so it goes through the site's proxy route
    /// when the transport has one and falls back to the API otherwise.
    pub async fn blogs(&self) -> Result<Vec<Value>, ContentError> {
        let profile: Value = self
            .fetcher
            .fetch_with_validation(PROFILE_PATH, &RequestOptions::get(), has_blogs)
            .await?;

        match profile.get("blogs") {
            Some(Value::Array(blogs)) => Ok(blogs.clone()),
            _ => Err(ContentError::MissingField("blogs".to_string())),
        }
    }

    /// Reads any JSON resource under the API, cached by its path
    pub async fn resource(&self, path: &str) -> Result<Value, ContentError> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        self.cached(&path, &path).await
    }

    /// Loads the profile and the project list concurrently
    pub async fn snapshot(&self) -> Result<Snapshot, ContentError> {
        let (profile, projects) = futures::try_join!(self.profile(), self.projects())?;
        Ok(Snapshot { profile, projects })
    }

    /// Submits a contact form message
    ///
    /// Submissions are never retried. A successful submission clears the
    /// cache so the next read reflects any server-side change.
    pub async fn submit_contact(&self, message: &ContactMessage) -> Result<Value, ContentError> {
        message.validate()?;

        let body = serde_json::to_value(message).map_err(FetchError::from)?;
        let response = self
            .fetcher
            .clone()
            .with_policy(RetryPolicy::none())
            .fetch_with_retry(&self.url(CONTACT_PATH), &RequestOptions::post_json(&body))
            .await?;

        self.cache.clear();

        // The backend answers with a small JSON acknowledgement; anything else is kept as text
        Ok(response
            .json::<Value>()
            .unwrap_or_else(|_| Value::String(response.body.clone())))
    }
}

/// Whether a profile document carries at least one blog entry
fn has_blogs(profile: &Value) -> bool {
    profile
        .get("blogs")
        .and_then(Value::as_array)
        .is_some_and(|blogs| !blogs.is_empty())
}
