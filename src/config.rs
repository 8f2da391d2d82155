//! Runtime configuration
//!
//! Settings come from CLI flags, with `FOLIO_API_URL` and `FOLIO_SITE_URL`
//! read from the environment by clap, and fall back to the defaults below. `Config` is
//! also the composition root: it builds the cache, fetcher and content
//! client the commands run against.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{DiskStorage, TtlCache, DEFAULT_TTL};
use crate::cli::{Cli, CliError};
use crate::content::ContentClient;
use crate::fetch::{is_empty_json, Fetcher, ReqwestTransport, RetryPolicy};
use crate::report::{Reporter, TracingReporter};

/// Content API used when no url is configured
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Where cached entries are kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    /// Process-local; gone when the process exits
    Memory,
    /// JSON files in the given directory
    Disk(PathBuf),
}

/// Configuration for the content client
#[derive(Debug, Clone)]
pub struct Config {
    /// Base url of the content API, without a trailing slash
    pub api_url: String,
    /// Origin that root-relative requests are sent to; the API itself if unset
    pub site_url: Option<String>,
    /// Freshness window for cached content
    pub cache_ttl: Duration,
    /// Retry schedule for reads
    pub retry: RetryPolicy,
    /// Whether empty JSON bodies are retried like failures
    pub retry_empty: bool,
    /// Cache storage
    pub cache: CacheBackend,
}

impl Default for Config {
    fn default() -> Self {
        let cache = match DiskStorage::new() {
            Some(storage) => CacheBackend::Disk(storage.dir().clone()),
            None => CacheBackend::Memory,
        };
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            site_url: None,
            cache_ttl: DEFAULT_TTL,
            retry: RetryPolicy::default(),
            retry_empty: true,
            cache,
        }
    }
}

impl Config {
    /// Creates a Config from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(Config)` with defaults overridden by any flags given
    /// * `Err(CliError::InvalidUrl)` if the API url is not absolute http(s)
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut config = Config::default();

        if let Some(url) = &cli.api_url {
            config.api_url = normalize_api_url(url)?;
        }
        if let Some(url) = &cli.site_url {
            config.site_url = Some(normalize_api_url(url)?);
        }
        if let Some(ttl) = cli.ttl {
            config.cache_ttl = Duration::from_secs(ttl);
        }
        if let Some(retries) = cli.retries {
            config.retry = config.retry.with_max_retries(retries);
        }
        if let Some(backoff_ms) = cli.backoff_ms {
            config.retry = config.retry.with_initial_backoff(Duration::from_millis(backoff_ms));
        }
        if cli.allow_empty {
            config.retry_empty = false;
        }

        if cli.no_disk_cache {
            config.cache = CacheBackend::Memory;
        } else if let Some(dir) = &cli.cache_dir {
            config.cache = CacheBackend::Disk(dir.clone());
        }

        Ok(config)
    }

    /// Builds the cache described by this config
    pub fn build_cache(&self, reporter: Arc<dyn Reporter>) -> TtlCache {
        let cache = match &self.cache {
            CacheBackend::Memory => TtlCache::in_memory(),
            CacheBackend::Disk(dir) => TtlCache::on_disk(DiskStorage::with_dir(dir.clone())),
        };
        cache.with_reporter(reporter).with_default_ttl(self.cache_ttl)
    }

    /// Builds the fetcher described by this config
    ///
    /// Root-relative urls are sent to the site origin and, if that fails,
    /// repeated against the API url.
    pub fn build_fetcher(&self, reporter: Arc<dyn Reporter>) -> Fetcher {
        let origin = self.site_url.as_deref().unwrap_or(&self.api_url);
        let transport = match reqwest::Url::parse(origin) {
            Ok(origin) => ReqwestTransport::new().with_origin(origin),
            Err(_) => ReqwestTransport::new(),
        };
        let fetcher = Fetcher::new(Arc::new(transport))
            .with_policy(self.retry)
            .with_reporter(reporter)
            .with_fallback_base(self.api_url.clone());
        if self.retry_empty {
            fetcher.with_empty_check(is_empty_json)
        } else {
            fetcher
        }
    }

    /// Builds a content client reporting through `tracing`
    pub fn build_client(&self) -> ContentClient {
        let reporter: Arc<dyn Reporter> = Arc::new(TracingReporter);
        ContentClient::new(
            self.api_url.clone(),
            self.build_fetcher(reporter.clone()),
            self.build_cache(reporter),
        )
    }
}

/// Checks that `url` is an absolute http(s) url and strips trailing slashes
fn normalize_api_url(url: &str) -> Result<String, CliError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| CliError::InvalidUrl(url.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CliError::InvalidUrl(url.to_string()));
    }
    Ok(url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.retry, RetryPolicy::default());
        assert!(config.retry_empty);
    }

    #[test]
    fn test_config_from_cli_overrides() {
        let cli = Cli::parse_from([
            "folio",
            "--api-url",
            "https://backend.example/",
            "--ttl",
            "30",
            "--retries",
            "5",
            "--backoff-ms",
            "50",
            "--allow-empty",
            "--no-disk-cache",
            "profile",
        ]);
        let config = Config::from_cli(&cli).unwrap();

        assert_eq!(config.api_url, "https://backend.example");
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_backoff, Duration::from_millis(50));
        assert_eq!(config.retry.backoff_factor, 2.0);
        assert!(!config.retry_empty);
        assert_eq!(config.cache, CacheBackend::Memory);
    }

    #[test]
    fn test_config_from_cli_cache_dir() {
        let cli = Cli::parse_from(["folio", "--cache-dir", "/tmp/folio-test", "profile"]);
        let config = Config::from_cli(&cli).unwrap();
        assert_eq!(config.cache, CacheBackend::Disk(PathBuf::from("/tmp/folio-test")));
    }

    #[test]
    fn test_config_rejects_non_http_url() {
        for url in ["ftp://backend.example", "not a url", "/api"] {
            let cli = Cli::parse_from(["folio", "--api-url", url, "profile"]);
            let err = Config::from_cli(&cli).unwrap_err();
            assert!(err.to_string().contains("Invalid API url"));
        }
    }

    #[test]
    fn test_build_client_uses_configured_url_and_ttl() {
        let config = Config {
            api_url: "http://api.test".to_string(),
            cache_ttl: Duration::from_secs(42),
            cache: CacheBackend::Memory,
            ..Config::default()
        };
        let client = config.build_client();
        assert_eq!(client.base_url(), "http://api.test");
        assert_eq!(client.cache().default_ttl(), Duration::from_secs(42));
        assert!(client.cache().is_empty());
    }

    #[test]
    fn test_config_from_cli_site_url() {
        let cli = Cli::parse_from([
            "folio",
            "--api-url",
            "http://api.test",
            "--site-url",
            "https://site.test/",
            "blogs",
        ]);
        let config = Config::from_cli(&cli).unwrap();
        assert_eq!(config.site_url.as_deref(), Some("https://site.test"));

        let cli = Cli::parse_from(["folio", "--site-url", "ftp://site.test", "blogs"]);
        assert!(Config::from_cli(&cli).is_err());
    }

    #[test]
    fn test_build_fetcher_falls_back_to_api_url() {
        let config = Config {
            api_url: "http://api.test".to_string(),
            site_url: Some("https://site.test".to_string()),
            cache: CacheBackend::Memory,
            ..Config::default()
        };
        let fetcher = config.build_fetcher(Arc::new(TracingReporter));
        assert_eq!(fetcher.fallback_base(), Some("http://api.test"));
    }
}
