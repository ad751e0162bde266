//! HTTP client layer: `RequestClient` with per-call retry policies.

pub mod client;
pub mod retry;

pub use client::{RequestClient, RequestOptions};
pub use retry::{RetryConfig, RetryPolicy};
