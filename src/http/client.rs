//! Low-level HTTP client: `RequestClient`.
//!
//! Sends one authenticated JSON request and classifies the outcome into a
//! typed value or an [`HttpError`]. Resource sub-clients wrap this.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::HttpError;
use crate::http::retry::{RetryConfig, RetryPolicy};
use crate::session::Session;

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers merged after the standard ones.
    pub headers: HeaderMap,
    /// Let `headers` replace `Authorization`/`Content-Type`. Without this,
    /// caller values for those two are dropped with a warning.
    pub allow_header_override: bool,
    pub retry: RetryPolicy,
}

impl RequestOptions {
    pub fn retry(retry: RetryPolicy) -> Self {
        Self {
            retry,
            ..Self::default()
        }
    }
}

/// Low-level HTTP client for the blotter REST API.
#[derive(Clone)]
pub struct RequestClient {
    base_url: String,
    client: Client,
    session: Session,
}

impl RequestClient {
    pub fn new(base_url: &str, session: Session) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ── Convenience verbs ────────────────────────────────────────────────

    /// `GET` with the idempotent retry policy.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        self.request(
            Method::GET,
            path,
            None::<&()>,
            RequestOptions::retry(RetryPolicy::Idempotent),
        )
        .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        self.request(Method::POST, path, Some(body), RequestOptions::default())
            .await
    }

    /// `POST` without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        self.request(Method::POST, path, None::<&()>, RequestOptions::default())
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        self.request(Method::PUT, path, Some(body), RequestOptions::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        self.request(Method::DELETE, path, None::<&()>, RequestOptions::default())
            .await
    }

    // ── Core ─────────────────────────────────────────────────────────────

    /// Send `method <base><path>` and decode the response as `T`.
    pub async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<T, HttpError> {
        let config = match &options.retry {
            RetryPolicy::None => {
                return self.do_request(&method, path, body, &options).await;
            }
            RetryPolicy::Idempotent => RetryConfig::idempotent(),
            RetryPolicy::Custom(c) => c.clone(),
        };

        let mut attempt = 0;
        loop {
            match self.do_request::<T, B>(&method, path, body, &options).await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < config.max_retries && config.is_retryable(&e) => {
                    let delay = config.delay_for_attempt(attempt);
                    tracing::debug!(
                        attempt = attempt + 1,
                        max = config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying {} {}: {}",
                        method,
                        path,
                        e
                    );
                    futures_timer::Delay::new(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn do_request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
        options: &RequestOptions,
    ) -> Result<T, HttpError> {
        let token = self.session.token();
        let headers = build_headers(
            token.as_deref(),
            &options.headers,
            options.allow_header_override,
        );

        let mut req = self
            .client
            .request(method.clone(), self.url(path))
            .headers(headers);
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        let result = decode_response(status, &text);
        if let Err(HttpError::Unauthorized { .. }) = &result {
            self.session.expire(token.as_deref());
        }
        result
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// ─── Headers ─────────────────────────────────────────────────────────────────

/// Standard headers plus caller extras.
pub(crate) fn build_headers(
    token: Option<&str>,
    extra: &HeaderMap,
    allow_override: bool,
) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = token {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Stored credential is not a valid header value, sending unauthenticated"),
        }
    }

    for (name, value) in extra {
        let reserved = name == AUTHORIZATION || name == CONTENT_TYPE;
        if reserved {
            if allow_override {
                headers.insert(name.clone(), value.clone());
            } else {
                tracing::warn!("Ignoring caller-supplied {} header", name);
            }
        } else {
            headers.append(name.clone(), value.clone());
        }
    }

    headers
}

// ─── Response classification ─────────────────────────────────────────────────

/// Turn a status and body into a decoded value or a typed error.
pub(crate) fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<T, HttpError> {
    let is_html = body.trim_start().starts_with('<');

    if !status.is_success() {
        let code = status.as_u16();
        let detail = if is_html { None } else { extract_detail(body) }
            .unwrap_or_else(|| status_phrase(status));

        if status == StatusCode::UNAUTHORIZED {
            return Err(HttpError::Unauthorized { detail });
        }
        if is_html {
            return Err(HttpError::Protocol { status: code });
        }
        return Err(HttpError::Application {
            status: code,
            detail,
        });
    }

    if is_html {
        return Err(HttpError::Protocol {
            status: status.as_u16(),
        });
    }

    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| HttpError::InvalidBody(e.to_string()))
}

/// The `detail` message of an error body, if there is one.
///
/// Validation failures carry a list of `{loc, msg, type}` objects; their
/// messages are joined.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .map(|item| match item.get("msg").and_then(Value::as_str) {
                    Some(msg) => msg.to_string(),
                    None => item.to_string(),
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        other => Some(other.to_string()),
    }
}

/// Standard reason phrase for `status`, or `HTTP <code>` for unregistered codes.
///
/// HTTP/2 has no reason phrase and reqwest does not expose the HTTP/1.1 one, so
/// a custom phrase sent by a gateway is not preserved.
fn status_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

/// Append `key=value` pairs to `path`, skipping `None` values.
pub(crate) fn with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let query: Vec<String> = params
        .iter()
        .filter_map(|(k, v)| {
            v.as_ref()
                .map(|v| format!("{}={}", k, urlencoding::encode(v)))
        })
        .collect();
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, query.join("&"))
    }
}
