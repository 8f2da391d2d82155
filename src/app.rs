//! Command execution
//!
//! Maps a parsed [`Command`] onto the content client and returns the JSON
//! value to print.

use serde_json::Value;

use crate::cache::cache_control_header;
use crate::cli::{CacheAction, Command};
use crate::content::{ContactMessage, ContentClient, ContentError, Query};

/// Runs one command against `client`
pub async fn execute(client: &ContentClient, command: Command) -> Result<Value, ContentError> {
    match command {
        Command::Profile => client.profile().await,
        Command::Projects => client.projects().await,
        Command::Blogs => Ok(Value::Array(client.blogs().await?)),
        Command::Blog { query } => client.blog_posts(&query.into_iter().collect::<Query>()).await,
        Command::BlogDetailed { query } => {
            client.blog_detailed(&query.into_iter().collect::<Query>()).await
        }
        Command::Snapshot => {
            let snapshot = client.snapshot().await?;
            Ok(serde_json::json!({
                "profile": snapshot.profile,
                "projects": snapshot.projects,
            }))
        }
        Command::Get { path } => client.resource(&path).await,
        Command::Contact {
            name,
            email,
            subject,
            message,
        } => {
            let message = ContactMessage {
                name,
                email,
                subject,
                message,
            };
            client.submit_contact(&message).await
        }
        Command::Cache { action } => Ok(run_cache_action(client, action)),
        Command::CacheHeader { max_age, swr } => {
            Ok(Value::String(cache_control_header(max_age, swr)))
        }
    }
}

fn run_cache_action(client: &ContentClient, action: CacheAction) -> Value {
    let cache = client.cache();
    match action {
        CacheAction::List => {
            let mut keys = cache.keys();
            keys.sort();
            Value::from(keys)
        }
        CacheAction::Invalidate { key } => {
            let existed = cache.contains(&key);
            cache.invalidate(&key);
            serde_json::json!({ "invalidated": key, "existed": existed })
        }
        CacheAction::Clear => {
            let removed = cache.len();
            cache.clear();
            serde_json::json!({ "cleared": removed })
        }
    }
}
