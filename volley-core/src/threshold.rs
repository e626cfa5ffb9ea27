use crate::ThresholdError;
use std::fmt;

/// How a metric is reduced to a single number before comparison.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Aggregation {
    /// Quantile of a trend, stored as a fraction (`p(95)` is `0.95`).
    Percentile(f64),
    Avg,
    Min,
    Med,
    Max,
    /// Fraction of `true` samples of a rate metric.
    Rate,
    /// Total of a counter.
    Count,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparison {
    fn holds(&self, actual: f64, expected: f64) -> bool {
        match self {
            Comparison::Lt => actual < expected,
            Comparison::Le => actual <= expected,
            Comparison::Gt => actual > expected,
            Comparison::Ge => actual >= expected,
            Comparison::Eq => actual == expected,
        }
    }
}

/// A pass/fail condition on an aggregated metric, e.g. `http_req_duration: p(95)<2000`.
///
/// Trend aggregations are compared in milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct Threshold {
    pub metric: String,
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub value: f64,
    expression: String,
}

impl Threshold {
    pub fn parse(metric: &str, expression: &str) -> Result<Self, ThresholdError> {
        let expr = expression.trim();
        let op_start = expr
            .find(['<', '>', '='])
            .ok_or_else(|| ThresholdError::MissingOperator(expr.to_string()))?;

        let (lhs, rest) = expr.split_at(op_start);
        let (comparison, rhs) = if let Some(rhs) = rest.strip_prefix("<=") {
            (Comparison::Le, rhs)
        } else if let Some(rhs) = rest.strip_prefix(">=") {
            (Comparison::Ge, rhs)
        } else if let Some(rhs) = rest.strip_prefix("==") {
            (Comparison::Eq, rhs)
        } else if let Some(rhs) = rest.strip_prefix('<') {
            (Comparison::Lt, rhs)
        } else if let Some(rhs) = rest.strip_prefix('>') {
            (Comparison::Gt, rhs)
        } else {
            return Err(ThresholdError::MissingOperator(expr.to_string()));
        };

        let aggregation = parse_aggregation(lhs.trim())?;
        let rhs = rhs.trim();
        let value = rhs
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ThresholdError::InvalidValue(rhs.to_string()))?;

        Ok(Self {
            metric: metric.to_string(),
            aggregation,
            comparison,
            value,
            expression: expr.to_string(),
        })
    }

    pub fn holds(&self, actual: f64) -> bool {
        self.comparison.holds(actual, self.value)
    }

    /// The expression as written, without the metric name.
    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.metric, self.expression)
    }
}

fn parse_aggregation(s: &str) -> Result<Aggregation, ThresholdError> {
    match s {
        "avg" => Ok(Aggregation::Avg),
        "min" => Ok(Aggregation::Min),
        "med" => Ok(Aggregation::Med),
        "max" => Ok(Aggregation::Max),
        "rate" => Ok(Aggregation::Rate),
        "count" => Ok(Aggregation::Count),
        _ => {
            let inner = s
                .strip_prefix("p(")
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(|| ThresholdError::UnknownAggregation(s.to_string()))?;

            match inner.trim().parse::<f64>() {
                Ok(p) if p > 0. && p <= 100. => Ok(Aggregation::Percentile(p / 100.)),
                _ => Err(ThresholdError::InvalidPercentile(s.to_string())),
            }
        }
    }
}
