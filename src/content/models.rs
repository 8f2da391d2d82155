//! Request and response shapes for the content API
//!
//! Most content is passed through as raw JSON; only the pieces the client
//! has to build or inspect itself get a type here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ContentError;

/// Query parameters appended to a content request
///
/// Pairs keep their insertion order, so the same query always serializes to
/// the same string and therefore the same cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `key=value` pair
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serializes to a `?a=1&b=2` search string, or `""` when empty
    pub fn to_search(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }
        let joined = self
            .pairs
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("?{}", joined)
    }
}

impl FromIterator<(String, String)> for Query {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// A contact form submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    /// Checks the fields the backend would reject anyway
    pub fn validate(&self) -> Result<(), ContentError> {
        let required = [
            ("name", &self.name),
            ("subject", &self.subject),
            ("message", &self.message),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ContentError::InvalidContact(format!("{} must not be empty", field)));
        }

        let valid_email = self
            .email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(ContentError::InvalidContact(format!(
                "'{}' is not a valid email address",
                self.email
            )));
        }

        Ok(())
    }
}

/// Profile and projects loaded together
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub profile: Value,
    pub projects: Value,
}
