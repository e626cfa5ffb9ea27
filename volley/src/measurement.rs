use pdatastructs::tdigest::{TDigest, K1};
use std::time::Duration;
use tracing::error;
use volley_core::{Aggregation, TrendSummary};

const TDIGEST_COMPRESSION: f64 = 100.;
const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Latency samples of one trend metric.
///
/// Count, sum and extrema are exact; quantiles come from the digest.
#[derive(Debug, Clone)]
pub(crate) struct TrendDigest {
    digest: TDigest<K1>,
    count: u64,
    sum: Duration,
    min: Duration,
    max: Duration,
}

impl TrendDigest {
    pub fn new() -> Self {
        Self {
            digest: TDigest::new(K1::new(TDIGEST_COMPRESSION), TDIGEST_BACKLOG_SIZE),
            count: 0,
            sum: Duration::ZERO,
            min: Duration::MAX,
            max: Duration::ZERO,
        }
    }

    pub fn insert(&mut self, sample: Duration) {
        self.digest.insert(sample.as_secs_f64());
        self.count += 1;
        self.sum += sample;
        self.min = self.min.min(sample);
        self.max = self.max.max(sample);
    }

    pub fn extend(&mut self, samples: &[Duration]) {
        for sample in samples {
            self.insert(*sample);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn quantile(&self, quantile: f64) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }

        let secs = self.digest.quantile(quantile);

        // TDigest occasionally yields NaN for sparse inputs.
        let secs = if secs.is_finite() {
            secs
        } else {
            error!("NaN latency calculation for quantile {quantile}");
            0.
        };

        Duration::from_secs_f64(secs.max(0.)).clamp(self.min, self.max)
    }

    pub fn avg(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(self.sum.as_secs_f64() / self.count as f64)
        }
    }

    pub fn summary(&self) -> Option<TrendSummary> {
        if self.count == 0 {
            return None;
        }

        Some(TrendSummary {
            count: self.count,
            avg: self.avg(),
            min: self.min,
            med: self.quantile(0.5),
            max: self.max,
            p90: self.quantile(0.90),
            p95: self.quantile(0.95),
            p99: self.quantile(0.99),
        })
    }

    /// Value of `aggregation` in milliseconds, `None` if the aggregation does not apply to trends
    /// or there are no samples.
    pub fn aggregate(&self, aggregation: Aggregation) -> Option<f64> {
        if self.count == 0 {
            return None;
        }

        let value = match aggregation {
            Aggregation::Avg => self.avg(),
            Aggregation::Min => self.min,
            Aggregation::Med => self.quantile(0.5),
            Aggregation::Max => self.max,
            Aggregation::Percentile(q) => self.quantile(q),
            Aggregation::Count => return Some(self.count as f64),
            Aggregation::Rate => return None,
        };

        Some(value.as_secs_f64() * 1_000.)
    }
}
