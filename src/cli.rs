//! Command-line interface parsing for folio
//!
//! This module handles parsing of CLI arguments using clap: global options
//! that shape the cache and retry behaviour, and one subcommand per content
//! endpoint.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--query` argument was not of the form `key=value`
    #[error("Invalid query parameter: '{0}'. Expected KEY=VALUE")]
    InvalidQuery(String),

    /// The API url is not an absolute http(s) url
    #[error("Invalid API url: '{0}'. Expected an absolute http:// or https:// url")]
    InvalidUrl(String),
}

/// folio - Read portfolio content through a local cache
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Portfolio content client with caching and retries")]
#[command(version)]
pub struct Cli {
    /// Base url of the content API
    #[arg(long, global = true, env = "FOLIO_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Origin of the portfolio site whose `/api` routes proxy the API
    ///
    /// Root-relative requests go here first and fall back to `--api-url`.
    #[arg(long, global = true, env = "FOLIO_SITE_URL", value_name = "URL")]
    pub site_url: Option<String>,

    /// How long cached content stays fresh, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub ttl: Option<u64>,

    /// Retries after the first failed attempt
    #[arg(long, global = true, value_name = "N")]
    pub retries: Option<u32>,

    /// Delay before the first retry, in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub backoff_ms: Option<u64>,

    /// Keep the cache in memory only, for this run
    #[arg(long, global = true)]
    pub no_disk_cache: bool,

    /// Directory for the on-disk cache
    #[arg(long, global = true, value_name = "DIR", conflicts_with = "no_disk_cache")]
    pub cache_dir: Option<PathBuf>,

    /// Accept empty JSON bodies instead of retrying them
    #[arg(long, global = true)]
    pub allow_empty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Content to read or cache maintenance to perform
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the profile document
    Profile,
    /// Show the project list
    Projects,
    /// Show the blog entries embedded in the profile
    Blogs,
    /// Show a page of blog posts
    Blog {
        /// Query parameter to forward, e.g. `--query page=2`
        #[arg(long, short, value_name = "KEY=VALUE", value_parser = parse_query_arg)]
        query: Vec<(String, String)>,
    },
    /// Show detailed blog posts (never cached)
    BlogDetailed {
        /// Query parameter to forward, e.g. `--query tag=rust`
        #[arg(long, short, value_name = "KEY=VALUE", value_parser = parse_query_arg)]
        query: Vec<(String, String)>,
    },
    /// Show the profile and project list together
    Snapshot,
    /// Show any JSON resource under the API
    Get {
        /// Path relative to the API base, e.g. `/api/skills`
        path: String,
    },
    /// Send a message through the contact form
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        message: String,
    },
    /// Inspect or reset the cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Print a Cache-Control header value for serving cached content
    CacheHeader {
        /// Freshness lifetime in seconds
        #[arg(long, default_value_t = 300)]
        max_age: u64,
        /// Stale-while-revalidate window in seconds
        #[arg(long, default_value_t = 3600)]
        swr: u64,
    },
}

/// Cache maintenance actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CacheAction {
    /// List cached keys
    List,
    /// Remove one cached key
    Invalidate { key: String },
    /// Remove every cached key
    Clear,
}

/// Parses a `key=value` query argument.
///
/// # Arguments
/// * `s` - The argument string from CLI
///
/// # Returns
/// * `Ok((key, value))` if the argument has a non-empty key
/// * `Err(CliError::InvalidQuery)` otherwise
pub fn parse_query_arg(s: &str) -> Result<(String, String), CliError> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::InvalidQuery(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_arg() {
        assert_eq!(
            parse_query_arg("page=2").unwrap(),
            ("page".to_string(), "2".to_string())
        );
        assert_eq!(
            parse_query_arg("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_query_arg("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
    }

    #[test]
    fn test_parse_query_arg_invalid() {
        assert!(parse_query_arg("novalue").is_err());
        let err = parse_query_arg("=2").unwrap_err();
        assert!(err.to_string().contains("Invalid query parameter"));
        assert!(err.to_string().contains("=2"));
    }

    #[test]
    fn test_cli_parse_profile() {
        let cli = Cli::parse_from(["folio", "profile"]);
        assert_eq!(cli.command, Command::Profile);
        assert!(!cli.no_disk_cache);
        assert!(cli.ttl.is_none());
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["folio", "projects", "--ttl", "60", "--retries", "0"]);
        assert_eq!(cli.command, Command::Projects);
        assert_eq!(cli.ttl, Some(60));
        assert_eq!(cli.retries, Some(0));
    }

    #[test]
    fn test_cli_parse_blog_queries() {
        let cli = Cli::parse_from(["folio", "blog", "--query", "page=2", "-q", "tag=rust"]);
        assert_eq!(
            cli.command,
            Command::Blog {
                query: vec![
                    ("page".to_string(), "2".to_string()),
                    ("tag".to_string(), "rust".to_string()),
                ]
            }
        );
    }

    #[test]
    fn test_cli_rejects_bad_query() {
        let result = Cli::try_parse_from(["folio", "blog", "--query", "novalue"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_cache_actions() {
        let cli = Cli::parse_from(["folio", "cache", "invalidate", "blog?page=2"]);
        assert_eq!(
            cli.command,
            Command::Cache {
                action: CacheAction::Invalidate {
                    key: "blog?page=2".to_string()
                }
            }
        );

        let cli = Cli::parse_from(["folio", "cache", "clear"]);
        assert_eq!(cli.command, Command::Cache { action: CacheAction::Clear });
    }

    #[test]
    fn test_cli_cache_header_defaults() {
        let cli = Cli::parse_from(["folio", "cache-header"]);
        assert_eq!(cli.command, Command::CacheHeader { max_age: 300, swr: 3600 });
    }

    #[test]
    fn test_cli_cache_dir_conflicts_with_memory_cache() {
        let result = Cli::try_parse_from([
            "folio",
            "--no-disk-cache",
            "--cache-dir",
            "/tmp/x",
            "profile",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["folio"]).is_err());
    }
}
