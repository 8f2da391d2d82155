//! Get-or-fetch cache with TTL expiry and stale fallback

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::clock::{Clock, SystemClock};
use super::storage::{DiskStorage, MemoryStorage, Storage};
use crate::report::{Event, Reporter, TracingReporter};

/// Default freshness window (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Wrapper stored for each key
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// The cached data
    data: T,
    /// Epoch millis of the last successful write
    timestamp: i64,
}

/// Error returned when there is nothing cached to fall back on
#[derive(Debug)]
pub enum CacheError<E> {
    /// No entry exists for `key` and the loader failed
    MissAndFetchFailed { key: String, source: E },
}

impl<E> CacheError<E> {
    /// The key that could not be served
    pub fn key(&self) -> &str {
        match self {
            CacheError::MissAndFetchFailed { key, .. } => key,
        }
    }

    /// Unwraps the loader's error
    pub fn into_source(self) -> E {
        match self {
            CacheError::MissAndFetchFailed { source, .. } => source,
        }
    }
}

impl<E: fmt::Display> fmt::Display for CacheError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::MissAndFetchFailed { key, source } => {
                write!(f, "nothing cached for '{}' and loading failed: {}", key, source)
            }
        }
    }
}

impl<E: Error + 'static> Error for CacheError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CacheError::MissAndFetchFailed { source, .. } => Some(source),
        }
    }
}

/// A TTL cache that serves stale data when a refresh fails
///
/// Cloning is cheap and clones share the same backing storage. The cache is
/// meant for a small, bounded set of keys (one per endpoint and query); it
/// never evicts on its own.
///
/// Concurrent callers missing the same key may each run their loader. The
/// last successful write wins.
#[derive(Clone)]
pub struct TtlCache {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn Reporter>,
    default_ttl: Duration,
}

impl fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl TtlCache {
    /// Creates a cache over the given storage backend
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            clock: Arc::new(SystemClock),
            reporter: Arc::new(TracingReporter),
            default_ttl: DEFAULT_TTL,
        }
    }

    /// Creates a process-local cache
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Creates a cache persisted to disk
    pub fn on_disk(storage: DiskStorage) -> Self {
        Self::new(Arc::new(storage))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the cached value for `key`, loading it if missing or expired
    ///
    /// Uses the cache's default TTL. See [`TtlCache::get_or_fetch_with_ttl`].
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, loader: F) -> Result<T, CacheError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_fetch_with_ttl(key, self.default_ttl, loader).await
    }

    /// Returns the cached value for `key`, loading it if missing or expired
    ///
    /// An entry younger than `ttl` is returned without running `loader`. A
    /// zero `ttl` always loads. When the loader fails, any existing entry
    /// for `key` is returned regardless of age; only when there is none does
    /// the loader's error come back as [`CacheError::MissAndFetchFailed`].
    pub async fn get_or_fetch_with_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> Result<T, CacheError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let existing = match self.read_entry::<T>(key) {
            Some(entry) if self.age(&entry) < ttl => {
                self.reporter.report(Event::CacheHit { key });
                return Ok(entry.data);
            }
            other => other,
        };

        self.reporter.report(Event::CacheMiss { key });

        match loader().await {
            Ok(data) => {
                self.write_entry(key, &data);
                Ok(data)
            }
            Err(error) => match existing {
                Some(entry) => {
                    self.reporter.report(Event::StaleFallback {
                        key,
                        age: self.age(&entry),
                        error: &error,
                    });
                    Ok(entry.data)
                }
                None => Err(CacheError::MissAndFetchFailed {
                    key: key.to_string(),
                    source: error,
                }),
            },
        }
    }

    /// Removes one entry; a missing key is a no-op
    pub fn invalidate(&self, key: &str) {
        if let Err(error) = self.storage.remove(key) {
            self.reporter.report(Event::StorageFailed { key, error: &error });
        }
    }

    /// Removes every entry
    pub fn clear(&self) {
        if let Err(error) = self.storage.clear() {
            self.reporter.report(Event::StorageFailed { key: "*", error: &error });
        }
    }

    /// Whether an entry (fresh or stale) exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.storage.get(key).is_some()
    }

    /// Number of stored entries, fresh or stale
    pub fn len(&self) -> usize {
        self.storage.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.storage.keys()
    }

    fn age<T>(&self, entry: &CacheEntry<T>) -> Duration {
        let elapsed = self.clock.now_millis().saturating_sub(entry.timestamp);
        Duration::from_millis(elapsed.max(0) as u64)
    }

    fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = self.storage.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(error) => {
                self.reporter.report(Event::EntryUnreadable { key, error: &error });
                None
            }
        }
    }

    fn write_entry<T: Serialize>(&self, key: &str, data: &T) {
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now_millis(),
        };

        let result = serde_json::to_string(&entry)
            .map_err(Into::into)
            .and_then(|json| self.storage.set(key, &json));

        if let Err(error) = result {
            self.reporter.report(Event::StorageFailed { key, error: &error });
        }
    }
}
