//! Reduction of a finished run's raw metrics into [`RunStatistics`].
use crate::executor::ExecutorOutcome;
use crate::metric::Snapshot;
use std::collections::BTreeMap;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{
    Aggregation, CheckTally, MetricSummary, RunStatistics, Threshold, ThresholdResult,
};

enum Evaluation {
    Value(f64),
    NoSamples,
    Unsupported,
}

pub(crate) fn summarize(
    name: &str,
    elapsed: Duration,
    outcome: ExecutorOutcome,
    snapshot: Snapshot,
    thresholds: &[Threshold],
) -> RunStatistics {
    let secs = elapsed.as_secs_f64();

    let results = thresholds
        .iter()
        .map(|threshold| evaluate(threshold, &snapshot, secs))
        .collect();

    let mut metrics = BTreeMap::new();
    for (name, total) in &snapshot.counters {
        let per_second = if secs > 0. { *total as f64 / secs } else { 0. };
        metrics.insert(
            name.clone(),
            MetricSummary::Counter {
                total: *total,
                per_second,
            },
        );
    }
    for (name, (passes, fails)) in &snapshot.rates {
        metrics.insert(
            name.clone(),
            MetricSummary::Rate {
                passes: *passes,
                fails: *fails,
            },
        );
    }
    for (name, digest) in &snapshot.trends {
        if let Some(summary) = digest.summary() {
            metrics.insert(name.clone(), MetricSummary::Trend(summary));
        }
    }

    let checks = snapshot
        .checks
        .into_iter()
        .map(|(name, (passes, fails))| CheckTally {
            name,
            passes,
            fails,
        })
        .collect();

    RunStatistics {
        name: name.to_string(),
        elapsed,
        peak_vus: outcome.peak_vus,
        interrupted_iterations: outcome.interrupted_iterations,
        metrics,
        checks,
        thresholds: results,
    }
}

fn evaluate(threshold: &Threshold, snapshot: &Snapshot, secs: f64) -> ThresholdResult {
    let name = threshold.metric.as_str();
    let evaluation = if let Some(total) = snapshot.counters.get(name) {
        match threshold.aggregation {
            Aggregation::Count => Evaluation::Value(*total as f64),
            Aggregation::Rate if secs > 0. => Evaluation::Value(*total as f64 / secs),
            Aggregation::Rate => Evaluation::NoSamples,
            _ => Evaluation::Unsupported,
        }
    } else if let Some((passes, fails)) = snapshot.rates.get(name) {
        let total = passes + fails;
        match threshold.aggregation {
            Aggregation::Rate if total == 0 => Evaluation::NoSamples,
            Aggregation::Rate => Evaluation::Value(*passes as f64 / total as f64),
            Aggregation::Count => Evaluation::Value(total as f64),
            _ => Evaluation::Unsupported,
        }
    } else if let Some(digest) = snapshot.trends.get(name) {
        match (threshold.aggregation, digest.aggregate(threshold.aggregation)) {
            (Aggregation::Rate, _) => Evaluation::Unsupported,
            (_, Some(value)) => Evaluation::Value(value),
            (_, None) => Evaluation::NoSamples,
        }
    } else {
        Evaluation::NoSamples
    };

    match evaluation {
        Evaluation::Value(actual) => ThresholdResult {
            threshold: threshold.clone(),
            actual: Some(actual),
            passed: threshold.holds(actual),
        },
        Evaluation::NoSamples => {
            debug!("No samples for threshold {threshold}; treating it as passed");
            ThresholdResult {
                threshold: threshold.clone(),
                actual: None,
                passed: true,
            }
        }
        Evaluation::Unsupported => {
            warn!("Aggregation in {threshold} does not apply to metric {name}; failing it");
            ThresholdResult {
                threshold: threshold.clone(),
                actual: None,
                passed: false,
            }
        }
    }
}
