//! Retrying, validating fetch helper

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::retry::{RetryPolicy, ValidationPolicy};
use super::transport::{HttpResponse, ReqwestTransport, RequestOptions, Transport};
use super::FetchError;
use crate::report::{Event, Reporter, TracingReporter};

/// Decides whether a parsed 2xx body counts as "no data"
pub type EmptyCheck = fn(&Value) -> bool;

/// Treats `null`, `[]` and `{}` as empty
pub fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Fetches over a [`Transport`], masking transient failures behind retries
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    validation: ValidationPolicy,
    reporter: Arc<dyn Reporter>,
    empty_check: Option<EmptyCheck>,
    fallback_base: Option<String>,
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("policy", &self.policy)
            .field("validation", &self.validation)
            .field("empty_check", &self.empty_check.is_some())
            .field("fallback_base", &self.fallback_base)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            validation: ValidationPolicy::default(),
            reporter: Arc::new(TracingReporter),
            empty_check: None,
            fallback_base: None,
        }
    }

    /// A fetcher using a default `reqwest` client
    pub fn http() -> Self {
        Self::new(Arc::new(ReqwestTransport::new()))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Also retry 2xx responses whose JSON body `check` deems empty
    pub fn with_empty_check(mut self, check: EmptyCheck) -> Self {
        self.empty_check = Some(check);
        self
    }

    /// Absolute base url tried when a validated fetch of a relative url fails
    pub fn with_fallback_base(mut self, base: impl Into<String>) -> Self {
        self.fallback_base = Some(base.into());
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn fallback_base(&self) -> Option<&str> {
        self.fallback_base.as_deref()
    }

    /// Fetches `url`, retrying failures according to the fetcher's policy
    ///
    /// Transport errors, non-2xx statuses and (with an empty check) empty
    /// JSON bodies all trigger a retry. After the last attempt the final
    /// cause is returned wrapped in [`FetchError::RetryExhausted`].
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse, FetchError> {
        self.fetch_with_policy(url, options, &self.policy).await
    }

    /// Fetches `url` with retries and decodes the body as JSON
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<T, FetchError> {
        self.fetch_with_retry(url, options).await?.json()
    }

    /// Fetches and decodes `url`, refetching once if `validator` rejects it
    ///
    /// The first cycle uses a short backoff. If the decoded data fails
    /// `validator`, exactly one more cycle runs with a longer backoff before
    /// giving up with [`FetchError::ValidationFailed`]. Bodies that don't
    /// decode are returned as errors straight away.
    ///
    /// If the whole call fails for a relative url and a fallback base is
    /// configured, it is repeated once against the absolute url.
    pub async fn fetch_with_validation<T, V>(
        &self,
        url: &str,
        options: &RequestOptions,
        validator: V,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        V: Fn(&T) -> bool,
    {
        match self.validated_cycles(url, options, &validator).await {
            Ok(data) => Ok(data),
            Err(error) => match self.fallback_url(url) {
                Some(absolute) => {
                    self.reporter.report(Event::FallbackUrl {
                        from: url,
                        to: &absolute,
                    });
                    self.validated_cycles(&absolute, options, &validator).await
                }
                None => Err(error),
            },
        }
    }

    async fn validated_cycles<T, V>(
        &self,
        url: &str,
        options: &RequestOptions,
        validator: &V,
    ) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        V: Fn(&T) -> bool,
    {
        let data: T = self
            .fetch_with_policy(url, options, &self.validation.first)
            .await?
            .json()?;
        if validator(&data) {
            return Ok(data);
        }

        self.reporter.report(Event::ValidationRejected { url });

        let data: T = self
            .fetch_with_policy(url, options, &self.validation.second)
            .await?
            .json()?;
        if validator(&data) {
            Ok(data)
        } else {
            Err(FetchError::ValidationFailed {
                url: url.to_string(),
            })
        }
    }

    async fn fetch_with_policy(
        &self,
        url: &str,
        options: &RequestOptions,
        policy: &RetryPolicy,
    ) -> Result<HttpResponse, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            let error = match self.attempt(url, options).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            if attempt >= policy.max_retries {
                return Err(FetchError::RetryExhausted {
                    attempts: attempt + 1,
                    last: Box::new(error),
                });
            }

            let delay = policy.delay_for(attempt);
            attempt += 1;
            self.reporter.report(Event::RetryScheduled {
                url,
                attempt,
                delay,
                error: &error,
            });
            tokio::time::sleep(delay).await;
        }
    }

    /// One request, classified as success or a retryable failure
    async fn attempt(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse, FetchError> {
        let response = self.transport.send(url, options).await?;

        if !response.ok() {
            return Err(FetchError::Http {
                status: response.status,
                status_text: response.status_text,
            });
        }

        if let Some(is_empty) = self.empty_check {
            // Bodies that aren't JSON are left for the caller's decoder to reject
            if let Ok(value) = serde_json::from_str::<Value>(&response.body) {
                if is_empty(&value) {
                    return Err(FetchError::EmptyResponse);
                }
            }
        }

        Ok(response)
    }

    fn fallback_url(&self, url: &str) -> Option<String> {
        if url.starts_with("http") {
            return None;
        }
        let base = self.fallback_base.as_deref()?.trim_end_matches('/');
        if url.starts_with('/') {
            Some(format!("{}{}", base, url))
        } else {
            Some(format!("{}/{}", base, url))
        }
    }
}
