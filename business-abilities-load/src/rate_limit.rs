//! Inspection of the `Ratelimit` response header, formatted as
//! `"default";r=<remaining>;t=<reset_seconds>`.
use regex::Regex;
use std::sync::OnceLock;
use tracing::warn;
use volley::http::Response;

pub const RATE_LIMIT_HEADER: &str = "Ratelimit";

/// Remaining quota below which every response logs a warning.
pub const LOW_QUOTA: u64 = 100;

fn remaining_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"r=(\d+)").expect("rate limit pattern is valid"))
}

/// Remaining requests advertised by a header value. Only the first `r=<digits>` counts; any other
/// shape yields `None`.
pub fn remaining(value: &str) -> Option<u64> {
    remaining_pattern()
        .captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Warn when the response reports a nearly exhausted quota. Returns the remaining count it warned
/// about.
pub fn inspect(response: &Response) -> Option<u64> {
    let remaining = response
        .header(RATE_LIMIT_HEADER)
        .and_then(remaining)
        .filter(|r| *r < LOW_QUOTA)?;

    warn!("Rate limit warning: Only {remaining} requests remaining in quota");
    Some(remaining)
}
