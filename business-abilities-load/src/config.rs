use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;
use volley::{ConstantArrivalRate, Executor, RampingVus, Stage, Threshold, ThresholdError};

/// Sustained request rate the API allows before throttling.
pub const API_RATE_LIMIT_PER_SECOND: u32 = 50;

pub const GRAPH_PATH: &str = "/api/v1.0/graph";

/// Pause after every iteration of the ramping profile.
pub const RAMPING_PAUSE: Duration = Duration::from_secs(1);

/// `(metric, expression)` pairs every run is judged against.
pub const THRESHOLDS: [(&str, &str); 4] = [
    ("http_req_duration", "p(95)<2000"),
    ("http_req_failed", "rate<0.05"),
    ("errors", "rate<0.05"),
    ("iteration_duration", "p(95)<3000"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// Fixed arrival rate; iterations never sleep.
    ConstantRate,
    /// Looping VUs ramped 0 -> 10 -> 20 -> 0, one second pause per iteration.
    Ramping,
}

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about = "Load test the business abilities GraphQL query",
    args_override_self = true
)]
pub struct Args {
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:4000")]
    pub base_url: String,

    #[arg(long, env = "AUTH_TOKEN", default_value = "", hide_env_values = true)]
    pub auth_token: String,

    #[arg(long, env = "STAFF_ID", default_value = "")]
    pub staff_id: String,

    #[arg(long, value_enum, default_value_t = Profile::ConstantRate)]
    pub profile: Profile,

    /// Iterations per second for the constant-rate profile.
    #[arg(long, default_value = "40")]
    pub rate: NonZeroU32,

    #[arg(long, default_value = "10m", value_parser = humantime::parse_duration)]
    pub duration: Duration,

    #[arg(long, default_value_t = 50)]
    pub pre_allocated_vus: usize,

    #[arg(long, default_value_t = 100)]
    pub max_vus: usize,

    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    pub graceful_stop: Duration,

    /// Per-request timeout.
    #[arg(long, default_value = "60s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Serve live Prometheus metrics on this address while the test runs.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,

    /// Tracing filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}

impl Args {
    pub fn context(&self) -> RequestContext {
        RequestContext {
            base_url: self.base_url.clone(),
            auth_token: self.auth_token.clone(),
            staff_id: self.staff_id.clone(),
            pause: match self.profile {
                Profile::ConstantRate => None,
                Profile::Ramping => Some(RAMPING_PAUSE),
            },
        }
    }

    pub fn executor(&self) -> Executor {
        match self.profile {
            Profile::ConstantRate => ConstantArrivalRate::new(self.rate, self.duration)
                .vus(self.pre_allocated_vus, self.max_vus)
                .into(),
            Profile::Ramping => RampingVus::new(ramp_stages()).into(),
        }
    }

    pub fn thresholds(&self) -> Result<Vec<Threshold>, ThresholdError> {
        THRESHOLDS
            .iter()
            .map(|(metric, expr)| Threshold::parse(metric, expr))
            .collect()
    }
}

pub fn ramp_stages() -> Vec<Stage> {
    vec![
        Stage::new(Duration::from_secs(30), 10),
        Stage::new(Duration::from_secs(60), 20),
        Stage::new(Duration::from_secs(30), 0),
    ]
}

/// Per-run request settings, shared read-only by every iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestContext {
    pub base_url: String,
    pub auth_token: String,
    pub staff_id: String,
    pub pause: Option<Duration>,
}

impl RequestContext {
    pub fn endpoint(&self) -> String {
        format!("{}{GRAPH_PATH}", self.base_url.trim_end_matches('/'))
    }
}
