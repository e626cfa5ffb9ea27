use crate::{Threshold, DROPPED_ITERATIONS, ITERATIONS};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Latency distribution of a trend metric.
#[derive(Clone, Debug, PartialEq)]
pub struct TrendSummary {
    pub count: u64,
    pub avg: Duration,
    pub min: Duration,
    pub med: Duration,
    pub max: Duration,
    pub p90: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetricSummary {
    Counter { total: u64, per_second: f64 },
    Rate { passes: u64, fails: u64 },
    Trend(TrendSummary),
}

impl MetricSummary {
    /// Fraction of `true` samples; 0 for an empty rate or a non-rate metric.
    pub fn rate(&self) -> f64 {
        match self {
            MetricSummary::Rate { passes, fails } if passes + fails > 0 => {
                *passes as f64 / (passes + fails) as f64
            }
            _ => 0.,
        }
    }

    pub fn count(&self) -> u64 {
        match self {
            MetricSummary::Counter { total, .. } => *total,
            MetricSummary::Rate { passes, fails } => passes + fails,
            MetricSummary::Trend(trend) => trend.count,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckTally {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdResult {
    pub threshold: Threshold,
    /// Aggregated value the threshold was compared against; `None` when the metric had no samples.
    pub actual: Option<f64>,
    pub passed: bool,
}

/// End-of-run report for a scenario.
#[derive(Clone, Debug)]
pub struct RunStatistics {
    pub name: String,
    pub elapsed: Duration,
    pub peak_vus: usize,
    pub interrupted_iterations: u64,
    pub metrics: BTreeMap<String, MetricSummary>,
    pub checks: Vec<CheckTally>,
    pub thresholds: Vec<ThresholdResult>,
}

impl RunStatistics {
    /// True when every configured threshold held.
    pub fn passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    pub fn metric(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.get(name)
    }

    pub fn iterations(&self) -> u64 {
        self.metric(ITERATIONS).map(MetricSummary::count).unwrap_or(0)
    }

    pub fn dropped_iterations(&self) -> u64 {
        self.metric(DROPPED_ITERATIONS)
            .map(MetricSummary::count)
            .unwrap_or(0)
    }

    pub fn check(&self, name: &str) -> Option<&CheckTally> {
        self.checks.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = Duration::from_millis(self.elapsed.as_millis() as u64);
        writeln!(
            f,
            "scenario {} finished in {} (peak {} VUs, {} interrupted iterations)",
            self.name,
            humantime::format_duration(elapsed),
            self.peak_vus,
            self.interrupted_iterations,
        )?;

        for check in &self.checks {
            let mark = if check.fails == 0 { "ok" } else { "FAIL" };
            writeln!(
                f,
                "  [{mark:>4}] {:.<40} {} passed / {} failed",
                check.name, check.passes, check.fails
            )?;
        }

        for (name, summary) in &self.metrics {
            match summary {
                MetricSummary::Counter { total, per_second } => {
                    writeln!(f, "  {name:.<32} {total} ({per_second:.2}/s)")?
                }
                MetricSummary::Rate { passes, fails } => writeln!(
                    f,
                    "  {name:.<32} {:.2}% ({passes} of {})",
                    summary.rate() * 100.,
                    passes + fails
                )?,
                MetricSummary::Trend(t) => writeln!(
                    f,
                    "  {name:.<32} avg={:?} min={:?} med={:?} max={:?} p(90)={:?} p(95)={:?} p(99)={:?}",
                    t.avg, t.min, t.med, t.max, t.p90, t.p95, t.p99
                )?,
            }
        }

        for result in &self.thresholds {
            let mark = if result.passed { "ok" } else { "FAIL" };
            match result.actual {
                Some(actual) => writeln!(f, "  [{mark:>4}] {} (actual {actual:.4})", result.threshold)?,
                None => writeln!(f, "  [{mark:>4}] {} (no samples)", result.threshold)?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> RunStatistics {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            ITERATIONS.to_string(),
            MetricSummary::Counter {
                total: 40,
                per_second: 4.,
            },
        );
        metrics.insert(
            "errors".to_string(),
            MetricSummary::Rate {
                passes: 1,
                fails: 3,
            },
        );

        RunStatistics {
            name: "business_abilities".to_string(),
            elapsed: Duration::from_secs(10),
            peak_vus: 3,
            interrupted_iterations: 0,
            metrics,
            checks: vec![CheckTally {
                name: "status is 200".to_string(),
                passes: 39,
                fails: 1,
            }],
            thresholds: vec![ThresholdResult {
                threshold: Threshold::parse("errors", "rate<0.05").unwrap(),
                actual: Some(0.25),
                passed: false,
            }],
        }
    }

    #[test]
    fn accessors() {
        let stats = stats();
        assert_eq!(stats.iterations(), 40);
        assert_eq!(stats.dropped_iterations(), 0);
        assert_eq!(stats.metric("errors").unwrap().rate(), 0.25);
        assert_eq!(stats.check("status is 200").unwrap().fails, 1);
        assert!(!stats.passed());
    }

    #[test]
    fn report_lists_failures() {
        let report = stats().to_string();
        assert!(report.contains("scenario business_abilities finished in 10s"));
        assert!(report.contains("[FAIL] status is 200"));
        assert!(report.contains("25.00% (1 of 4)"));
        assert!(report.contains("[FAIL] errors: rate<0.05 (actual 0.2500)"));
    }

    #[test]
    fn empty_thresholds_pass() {
        let mut stats = stats();
        stats.thresholds.clear();
        assert!(stats.passed());
    }
}
