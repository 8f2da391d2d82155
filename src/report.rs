//! Event reporting for the cache and fetch layers
//!
//! The cache and the fetcher never write logs themselves. Everything worth
//! knowing about (hits, misses, retries, stale fallbacks) is handed to a
//! caller-supplied [`Reporter`]. The default [`TracingReporter`] forwards
//! events to `tracing`.

use std::fmt;
use std::time::Duration;

/// Something that happened inside the cache or the fetcher
pub enum Event<'a> {
    /// A fresh entry was served without calling the loader
    CacheHit { key: &'a str },
    /// No fresh entry; the loader is about to run
    CacheMiss { key: &'a str },
    /// The loader failed and an older entry was served instead
    StaleFallback {
        key: &'a str,
        age: Duration,
        error: &'a dyn fmt::Display,
    },
    /// An entry exists on disk but could not be decoded
    EntryUnreadable { key: &'a str, error: &'a dyn fmt::Display },
    /// Writing or removing an entry failed
    StorageFailed { key: &'a str, error: &'a dyn fmt::Display },
    /// An attempt failed and another one is scheduled after `delay`
    RetryScheduled {
        url: &'a str,
        attempt: u32,
        delay: Duration,
        error: &'a dyn fmt::Display,
    },
    /// The response parsed but the validator rejected it
    ValidationRejected { url: &'a str },
    /// A relative url failed and the absolute fallback is being tried
    FallbackUrl { from: &'a str, to: &'a str },
}

/// Shows a borrowed error through its `Display` impl
struct Shown<'a>(&'a dyn fmt::Display);

impl fmt::Debug for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0.to_string())
    }
}

impl fmt::Debug for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::CacheHit { key } => f.debug_struct("CacheHit").field("key", key).finish(),
            Event::CacheMiss { key } => f.debug_struct("CacheMiss").field("key", key).finish(),
            Event::StaleFallback { key, age, error } => f
                .debug_struct("StaleFallback")
                .field("key", key)
                .field("age", age)
                .field("error", &Shown(*error))
                .finish(),
            Event::EntryUnreadable { key, error } => f
                .debug_struct("EntryUnreadable")
                .field("key", key)
                .field("error", &Shown(*error))
                .finish(),
            Event::StorageFailed { key, error } => f
                .debug_struct("StorageFailed")
                .field("key", key)
                .field("error", &Shown(*error))
                .finish(),
            Event::RetryScheduled {
                url,
                attempt,
                delay,
                error,
            } => f
                .debug_struct("RetryScheduled")
                .field("url", url)
                .field("attempt", attempt)
                .field("delay", delay)
                .field("error", &Shown(*error))
                .finish(),
            Event::ValidationRejected { url } => f
                .debug_struct("ValidationRejected")
                .field("url", url)
                .finish(),
            Event::FallbackUrl { from, to } => f
                .debug_struct("FallbackUrl")
                .field("from", from)
                .field("to", to)
                .finish(),
        }
    }
}

/// Receives events from the cache and the fetcher
pub trait Reporter: Send + Sync {
    fn report(&self, event: Event<'_>);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: Event<'_>) {
        match event {
            Event::CacheHit { key } => tracing::debug!(key, "cache hit"),
            Event::CacheMiss { key } => tracing::debug!(key, "cache miss, loading"),
            Event::StaleFallback { key, age, error } => tracing::warn!(
                key,
                age_ms = age.as_millis() as u64,
                error = %error,
                "load failed, serving stale entry"
            ),
            Event::EntryUnreadable { key, error } => {
                tracing::warn!(key, error = %error, "ignoring unreadable cache entry")
            }
            Event::StorageFailed { key, error } => {
                tracing::warn!(key, error = %error, "cache storage failed")
            }
            Event::RetryScheduled {
                url,
                attempt,
                delay,
                error,
            } => tracing::warn!(
                url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "fetch attempt failed, retrying"
            ),
            Event::ValidationRejected { url } => {
                tracing::warn!(url, "response failed validation, retrying with longer backoff")
            }
            Event::FallbackUrl { from, to } => {
                tracing::info!(from, to, "retrying against absolute backend url")
            }
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _event: Event<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_reporter_accepts_every_event() {
        // No subscriber is installed; this only checks that nothing panics.
        let reporter = TracingReporter;
        let error = "boom";
        reporter.report(Event::CacheHit { key: "k" });
        reporter.report(Event::CacheMiss { key: "k" });
        reporter.report(Event::StaleFallback {
            key: "k",
            age: Duration::from_secs(1),
            error: &error,
        });
        reporter.report(Event::EntryUnreadable { key: "k", error: &error });
        reporter.report(Event::StorageFailed { key: "k", error: &error });
        reporter.report(Event::RetryScheduled {
            url: "http://x",
            attempt: 1,
            delay: Duration::from_millis(300),
            error: &error,
        });
        reporter.report(Event::ValidationRejected { url: "http://x" });
        reporter.report(Event::FallbackUrl {
            from: "/api/profile",
            to: "http://x/api/profile",
        });
    }

    #[test]
    fn test_event_debug_shows_error_message() {
        let error = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let event = Event::StorageFailed {
            key: "profile",
            error: &error,
        };

        let debug = format!("{:?}", event);

        assert_eq!(debug, r#"StorageFailed { key: "profile", error: "disk full" }"#);
    }

    #[test]
    fn test_event_debug_retry_fields() {
        let error = "timed out";
        let debug = format!(
            "{:?}",
            Event::RetryScheduled {
                url: "http://x",
                attempt: 2,
                delay: Duration::from_millis(600),
                error: &error,
            }
        );

        assert!(debug.starts_with("RetryScheduled"));
        assert!(debug.contains("attempt: 2"));
        assert!(debug.contains(r#"error: "timed out""#));
    }
}
