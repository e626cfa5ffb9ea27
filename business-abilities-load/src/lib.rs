//! Load test for the `business.abilities.manage` GraphQL query.
//!
//! Each iteration posts the query, validates the response shape and feeds the `errors` rate.
//! Setup and teardown hooks log the run configuration around the engine run.
pub mod checks;
pub mod config;
pub mod hooks;
pub mod query;
pub mod rate_limit;
pub mod scenario;

pub use config::{Args, Profile, RequestContext};

use anyhow::{Context, Result};
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley::http::Client;
use volley::prelude::ConfigurableScenario;
use volley::RunStatistics;

/// Run one full load test described by `args` and return its statistics.
pub async fn run(args: &Args) -> Result<RunStatistics> {
    let ctx = Arc::new(args.context());
    let executor = args.executor();
    let thresholds = args.thresholds().context("Invalid threshold")?;
    let client = Client::with_timeout(args.timeout)?;

    let metadata = hooks::setup(&ctx, &executor);

    let stats = scenario::business_abilities(ctx, client)
        .executor(executor)
        .thresholds(thresholds)
        .graceful_stop(args.graceful_stop)
        .await
        .context("Load test could not start")?;

    hooks::teardown(&metadata);
    Ok(stats)
}
