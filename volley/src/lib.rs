#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

extern crate self as volley;

pub mod check;
pub mod error;
pub mod http;
pub mod metric;
pub mod scenario;

pub(crate) mod executor;
pub(crate) mod hook;
pub(crate) mod measurement;
pub(crate) mod summary;
pub(crate) mod timer;

pub use error::ScenarioError;
pub use scenario::Scenario;
pub use volley_core::{
    Aggregation, CheckTally, Comparison, ConfigError, ConstantArrivalRate, Executor,
    MetricSummary, RampingVus, RunStatistics, Stage, Threshold, ThresholdError, ThresholdResult,
    TrendSummary,
};
pub use volley_macros::scenario;

/// Builtin metric names.
pub mod builtin {
    pub use volley_core::{
        CHECKS, DROPPED_ITERATIONS, HTTP_REQS, HTTP_REQ_DURATION, HTTP_REQ_FAILED, ITERATIONS,
        ITERATION_DURATION,
    };
}

pub mod prelude {
    pub use crate::check::Checks;
    pub use crate::scenario::ConfigurableScenario;
    pub use crate::{http, metric};
    pub use volley_core::{
        ConstantArrivalRate, Executor, RampingVus, RunStatistics, Stage, Threshold,
    };
    pub use volley_macros::scenario;
}
