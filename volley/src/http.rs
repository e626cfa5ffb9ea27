//! Instrumented HTTP client.
//!
//! Every request records `http_reqs`, `http_req_duration` and `http_req_failed` into the running
//! scenario. Requests never fail from the caller's point of view: a transport error yields a
//! [`Response`] with status `0` and the error message attached.
use crate::metric;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use thiserror::Error;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{HTTP_REQS, HTTP_REQ_DURATION, HTTP_REQ_FAILED};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
#[error("Failed to build HTTP client: {0}")]
pub struct ClientError(#[from] reqwest::Error);

#[derive(Clone, Debug)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    pub fn new() -> Result<Self, ClientError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, ClientError> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { inner })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.inner.get(url))
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.inner.post(url))
    }
}

pub struct RequestBuilder {
    inner: reqwest::RequestBuilder,
    name: Option<&'static str>,
}

impl RequestBuilder {
    fn new(inner: reqwest::RequestBuilder) -> Self {
        Self { inner, name: None }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.inner = self.inner.header(key, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.inner = self.inner.body(body.into());
        self
    }

    /// Tag the request; tagged requests also record `http_req_duration{name:<tag>}`.
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub async fn send(self) -> Response {
        let start = Instant::now();
        let result = execute(self.inner).await;
        let duration = start.elapsed();

        let response = match result {
            Ok((status, headers, body)) => Response {
                status,
                headers,
                body,
                error: None,
                duration,
            },
            Err(err) => {
                debug!("Request failed: {err}");
                Response {
                    status: 0,
                    headers: HeaderMap::new(),
                    body: String::new(),
                    error: Some(err.to_string()),
                    duration,
                }
            }
        };

        metric::counter(HTTP_REQS, 1);
        metric::trend(HTTP_REQ_DURATION, duration);
        metric::rate(HTTP_REQ_FAILED, response.failed());
        if let Some(name) = self.name {
            metric::trend(&format!("{HTTP_REQ_DURATION}{{name:{name}}}"), duration);
        }

        trace!(
            "{} -> {} in {:?}",
            self.name.unwrap_or("request"),
            response.status,
            duration
        );
        response
    }
}

async fn execute(
    builder: reqwest::RequestBuilder,
) -> Result<(u16, HeaderMap, String), reqwest::Error> {
    let res = builder.send().await?;
    let status = res.status().as_u16();
    let headers = res.headers().clone();
    let body = res.text().await?;
    Ok((status, headers, body))
}

#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status, or `0` when no response was received.
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
    pub error: Option<String>,
    pub duration: Duration,
}

impl Response {
    /// Build a response by hand, mostly useful for testing response predicates.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            error: None,
            duration: Duration::ZERO,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(key), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(key, value);
        }
        self
    }

    /// Case-insensitive header lookup. Values that are not valid UTF-8 are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Transport errors and statuses of 400 and above count as failed.
    pub fn failed(&self) -> bool {
        self.status == 0 || self.status >= 400
    }
}
