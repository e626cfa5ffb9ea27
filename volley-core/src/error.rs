use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("No executor configured for scenario {0}")]
    MissingExecutor(String),

    #[error("Arrival rate time unit must be non-zero")]
    ZeroTimeUnit,

    #[error("Scenario duration must be non-zero")]
    ZeroDuration,

    #[error("Arrival rate is too high for its time unit; iterations would have no gap")]
    RateTooHigh,

    #[error("max_vus must be at least 1")]
    ZeroMaxVus,

    #[error("max_vus ({0}) exceeds the limit of {max} VUs", max = crate::MAX_VUS)]
    TooManyVus(usize),

    #[error("pre_allocated_vus ({pre_allocated}) exceeds max_vus ({max})")]
    PreAllocatedExceedsMax { pre_allocated: usize, max: usize },

    #[error("Ramping executor needs at least one stage")]
    NoStages,
}

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("Threshold expression `{0}` has no comparison operator")]
    MissingOperator(String),

    #[error("Unknown aggregation `{0}`")]
    UnknownAggregation(String),

    #[error("Invalid percentile in `{0}`; expected p(N) with 0 < N <= 100")]
    InvalidPercentile(String),

    #[error("Invalid threshold value `{0}`")]
    InvalidValue(String),
}
