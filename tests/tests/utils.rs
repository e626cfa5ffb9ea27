use business_abilities_load::Args;
use clap::Parser;
use mock_service::{Behavior, MockService};

/// Start a mock API and build runner arguments pointing at it.
#[allow(unused)]
pub async fn mock_with(behavior: Behavior) -> MockService {
    match MockService::spawn(behavior).await {
        Ok(mock) => mock,
        Err(err) => panic!("failed to start mock service: {err}"),
    }
}

/// Short constant-rate run against `base_url`; `extra` flags override the defaults.
#[allow(unused)]
pub fn short_run(base_url: &str, extra: &[&str]) -> Args {
    let mut argv = vec![
        "business-abilities-load",
        "--base-url",
        base_url,
        "--auth-token",
        "t0ken",
        "--staff-id",
        "17",
        "--rate",
        "20",
        "--duration",
        "1s",
        "--pre-allocated-vus",
        "2",
        "--max-vus",
        "10",
        "--graceful-stop",
        "2s",
        "--timeout",
        "2s",
    ];
    argv.extend_from_slice(extra);
    Args::parse_from(argv)
}
