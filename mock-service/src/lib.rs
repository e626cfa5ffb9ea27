//! Stand-in for the business GraphQL API.
//!
//! Serves `POST /api/v1.0/graph` with a configurable status, body, latency and `Ratelimit`
//! header, and remembers what it was sent so tests can assert on it.
use axum::{
    debug_handler,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::debug;

pub const GRAPH_PATH: &str = "/api/v1.0/graph";

pub const OK_BODY: &str = r#"{"data":{"business":{"abilities":{"manage":true}}}}"#;

#[derive(Clone, Debug)]
pub struct Behavior {
    pub status: u16,
    pub body: String,
    /// Value of `r=` in the `Ratelimit` header; no header when `None`.
    pub ratelimit_remaining: Option<u64>,
    pub delay: Duration,
    /// Requests per second served before answering 429.
    pub max_rps: Option<NonZeroU32>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            status: 200,
            body: OK_BODY.to_string(),
            ratelimit_remaining: Some(10_000),
            delay: Duration::ZERO,
            max_rps: None,
        }
    }
}

impl Behavior {
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn ratelimit_remaining(mut self, remaining: Option<u64>) -> Self {
        self.ratelimit_remaining = remaining;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_rps(mut self, max_rps: NonZeroU32) -> Self {
        self.max_rps = Some(max_rps);
        self
    }
}

/// The parts of a request tests care about.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub staff_id: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

struct MockState {
    behavior: Behavior,
    limiter: Option<DefaultDirectRateLimiter>,
    requests: AtomicU64,
    last_request: RwLock<Option<RecordedRequest>>,
}

impl MockState {
    fn new(behavior: Behavior) -> Self {
        Self {
            limiter: behavior.max_rps.map(rate_limiter),
            behavior,
            requests: AtomicU64::new(0),
            last_request: RwLock::new(None),
        }
    }
}

#[derive(Serialize)]
struct Stats {
    requests: u64,
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route(GRAPH_PATH, post(graph))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `addr` until the process exits.
pub async fn run(addr: SocketAddr, behavior: Behavior) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    debug!("Mock service listening on {}", listener.local_addr()?);
    axum::serve(listener, router(Arc::new(MockState::new(behavior)))).await?;
    Ok(())
}

/// A mock server bound to an ephemeral local port, shut down on drop.
pub struct MockService {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockService {
    pub async fn spawn(behavior: Behavior) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(MockState::new(behavior));
        let app = router(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!("Mock service stopped: {err}");
            }
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, without the graph path.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> u64 {
        self.state.requests.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state
            .last_request
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[debug_handler]
async fn graph(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    counter!("mock_service.requests").increment(1);
    state.requests.fetch_add(1, Ordering::Relaxed);

    let recorded = RecordedRequest {
        authorization: header_str(&headers, header::AUTHORIZATION.as_str()),
        staff_id: header_str(&headers, "x-staff-id"),
        content_type: header_str(&headers, header::CONTENT_TYPE.as_str()),
        body,
    };
    *state
        .last_request
        .write()
        .unwrap_or_else(PoisonError::into_inner) = Some(recorded);

    let behavior = &state.behavior;
    if !behavior.delay.is_zero() {
        tokio::time::sleep(behavior.delay).await;
    }

    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            debug!("Mock service throttling request");
            return with_ratelimit(
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    r#"{"errors":[{"message":"rate limited"}]}"#,
                )
                    .into_response(),
                Some(0),
            );
        }
    }

    let status = StatusCode::from_u16(behavior.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut res = (status, behavior.body.clone()).into_response();
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    with_ratelimit(res, behavior.ratelimit_remaining)
}

async fn stats(State(state): State<Arc<MockState>>) -> Json<Stats> {
    Json(Stats {
        requests: state.requests.load(Ordering::Relaxed),
    })
}

fn with_ratelimit(mut res: Response, remaining: Option<u64>) -> Response {
    if let Some(remaining) = remaining {
        let value = format!("\"default\";r={remaining};t=30");
        if let Ok(value) = HeaderValue::from_str(&value) {
            res.headers_mut().insert("ratelimit", value);
        }
    }
    res
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/** Utils **/

pub fn rate_limiter(rps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(rps).allow_burst(NonZeroU32::MIN))
}
