use std::time::Duration;

/// Builtin metric: number of HTTP requests issued.
pub const HTTP_REQS: &str = "http_reqs";
/// Builtin metric: time from sending a request until the full body is read.
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
/// Builtin metric: fraction of requests with a transport error or a status >= 400.
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
/// Builtin metric: number of completed iterations.
pub const ITERATIONS: &str = "iterations";
/// Builtin metric: wall-clock time of a single iteration.
pub const ITERATION_DURATION: &str = "iteration_duration";
/// Builtin metric: iterations an arrival-rate executor could not start for lack of a free VU.
pub const DROPPED_ITERATIONS: &str = "dropped_iterations";
/// Builtin metric: fraction of passing checks.
pub const CHECKS: &str = "checks";

/// Time VUs get to finish their current iteration once a run (or ramp-down) ends.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// Default denominator for arrival rates, i.e. `rate` iterations per second.
pub const DEFAULT_TIME_UNIT: Duration = Duration::from_secs(1);

/// Largest VU pool an arrival-rate executor accepts; tokio's semaphore permit limit.
pub const MAX_VUS: usize = usize::MAX >> 3;

/// How often the ramping executor re-targets its VU count.
pub const RAMP_TICK: Duration = Duration::from_millis(100);
