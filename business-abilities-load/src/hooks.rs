//! Once-per-run setup and teardown.
use crate::config::{RequestContext, API_RATE_LIMIT_PER_SECOND};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley::Executor;

/// Timestamps correlating a run with server-side logs.
#[derive(Clone, Debug, PartialEq)]
pub struct RunMetadata {
    pub start_time: OffsetDateTime,
}

impl RunMetadata {
    pub fn started_at(&self) -> String {
        format_timestamp(self.start_time)
    }
}

/// Log the run configuration and capture the start time.
pub fn setup(ctx: &RequestContext, executor: &Executor) -> RunMetadata {
    info!("Starting load test...");
    info!("Base URL: {}", ctx.base_url);
    info!("API Rate Limit: {API_RATE_LIMIT_PER_SECOND} requests/second");

    match executor {
        Executor::ConstantArrivalRate(car) => {
            let rate = car.per_second();
            info!(
                "Target Rate: {rate} requests/second ({:.0}% of limit)",
                rate / API_RATE_LIMIT_PER_SECOND as f64 * 100.
            );
            info!("Duration: {}", humantime::format_duration(car.duration));
            info!(
                "Total Expected Requests: {} requests",
                car.expected_iterations()
            );
            info!(
                "VUs: {} pre-allocated (peak {} VUs)",
                car.pre_allocated_vus, car.max_vus
            );
        }
        Executor::RampingVus(ramp) => {
            info!(
                "Stages: {} (peak {} VUs)",
                ramp.stages.len(),
                ramp.peak_vus()
            );
            info!(
                "Duration: {}",
                humantime::format_duration(ramp.total_duration())
            );
        }
    }

    if ctx.auth_token.is_empty() {
        warn!("AUTH_TOKEN not set. Requests will likely fail authentication.");
    }

    RunMetadata {
        start_time: OffsetDateTime::now_utc(),
    }
}

/// Log completion along with the run's start and end. Returns the end time.
pub fn teardown(metadata: &RunMetadata) -> OffsetDateTime {
    let end_time = OffsetDateTime::now_utc();
    info!("Load test completed.");
    info!("Started at: {}", metadata.started_at());
    info!("Ended at: {}", format_timestamp(end_time));
    end_time
}

fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}
