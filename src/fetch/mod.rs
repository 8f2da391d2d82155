//! Fetch module for talking to a flaky content API
//!
//! Wraps an HTTP transport with bounded retries, exponential backoff and
//! optional response validation. Transient failures are invisible to the
//! caller unless every attempt fails.

mod error;
mod fetcher;
mod retry;
mod transport;

pub use error::FetchError;
pub use fetcher::{is_empty_json, EmptyCheck, Fetcher};
pub use retry::{RetryPolicy, ValidationPolicy};
pub use transport::{HttpResponse, ReqwestTransport, RequestOptions, Transport};
