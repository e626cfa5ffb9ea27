//! Run-scoped metrics.
//!
//! Iteration code records values through the free functions in this module. They are routed to
//! the registry of the scenario the calling task belongs to, so concurrently running scenarios
//! never see each other's numbers.
use crate::hook::with_registry;
use crate::measurement::TrendDigest;
use metrics_util::AtomicBucket;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use volley_core::CHECKS;

/// Add `value` to the counter `name`.
pub fn counter(name: &str, value: u64) {
    with_registry(|r| r.counter(name, value));
}

/// Record one sample of the rate `name`; the summary reports the fraction of `true` samples.
pub fn rate(name: &str, value: bool) {
    with_registry(|r| r.rate(name, value));
}

/// Record one sample of the trend `name`.
pub fn trend(name: &str, value: Duration) {
    with_registry(|r| r.trend(name, value));
}

#[derive(Debug, Default)]
pub(crate) struct RateCell {
    passes: AtomicU64,
    fails: AtomicU64,
}

impl RateCell {
    fn add(&self, value: bool) {
        if value {
            self.passes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.fails.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn load(&self) -> (u64, u64) {
        (
            self.passes.load(Ordering::Relaxed),
            self.fails.load(Ordering::Relaxed),
        )
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
    rates: RwLock<HashMap<String, Arc<RateCell>>>,
    trends: RwLock<HashMap<String, Arc<AtomicBucket<Duration>>>>,
    // Kept in first-seen order so the report lists checks the way the scenario declares them.
    checks: RwLock<Vec<(String, Arc<RateCell>)>>,
    vus: AtomicUsize,
    peak_vus: AtomicUsize,
}

impl Registry {
    pub fn counter(&self, name: &str, value: u64) {
        get_or_insert(&self.counters, name, AtomicU64::default).fetch_add(value, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        ::metrics::counter!(name.to_string()).increment(value);
    }

    pub fn rate(&self, name: &str, value: bool) {
        get_or_insert(&self.rates, name, RateCell::default).add(value);

        #[cfg(feature = "metrics")]
        ::metrics::counter!(name.to_string(), "outcome" => outcome(value)).increment(1);
    }

    pub fn trend(&self, name: &str, value: Duration) {
        get_or_insert(&self.trends, name, AtomicBucket::new).push(value);

        #[cfg(feature = "metrics")]
        ::metrics::histogram!(name.to_string()).record(value.as_secs_f64());
    }

    pub fn check(&self, name: &str, passed: bool) {
        let existing = self
            .checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cell)| cell.clone());

        let cell = match existing {
            Some(cell) => cell,
            None => {
                let mut checks = self.checks.write().unwrap_or_else(PoisonError::into_inner);
                match checks.iter().find(|(n, _)| n == name) {
                    Some((_, cell)) => cell.clone(),
                    None => {
                        let cell = Arc::new(RateCell::default());
                        checks.push((name.to_string(), cell.clone()));
                        cell
                    }
                }
            }
        };

        cell.add(passed);
        self.rate(CHECKS, passed);

        #[cfg(feature = "metrics")]
        ::metrics::counter!("check", "check" => name.to_string(), "outcome" => outcome(passed))
            .increment(1);
    }

    pub fn vu_started(&self) {
        let active = self.vus.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_vus.fetch_max(active, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        ::metrics::gauge!("vus").set(active as f64);
    }

    pub fn vu_stopped(&self) {
        let active = self.vus.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);

        #[cfg(feature = "metrics")]
        ::metrics::gauge!("vus").set(active as f64);
        #[cfg(not(feature = "metrics"))]
        let _ = active;
    }

    pub fn active_vus(&self) -> usize {
        self.vus.load(Ordering::Relaxed)
    }

    pub fn peak_vus(&self) -> usize {
        self.peak_vus.load(Ordering::Relaxed)
    }

    /// Drain every metric into plain values for the end-of-run summary.
    pub fn snapshot(&self) -> Snapshot {
        let counters = self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, v)| (name.clone(), v.load(Ordering::Relaxed)))
            .collect();

        let rates = self
            .rates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, cell)| (name.clone(), cell.load()))
            .collect();

        let trends = self
            .trends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, bucket)| {
                let mut digest = TrendDigest::new();
                bucket.clear_with(|samples| digest.extend(samples));
                (name.clone(), digest)
            })
            .collect();

        let checks = self
            .checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, cell)| (name.clone(), cell.load()))
            .collect();

        Snapshot {
            counters,
            rates,
            trends,
            checks,
        }
    }
}

pub(crate) struct Snapshot {
    pub counters: HashMap<String, u64>,
    pub rates: HashMap<String, (u64, u64)>,
    pub trends: HashMap<String, TrendDigest>,
    pub checks: Vec<(String, (u64, u64))>,
}

fn get_or_insert<V>(
    map: &RwLock<HashMap<String, Arc<V>>>,
    name: &str,
    init: impl FnOnce() -> V,
) -> Arc<V> {
    if let Some(v) = map
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
    {
        return v.clone();
    }

    map.write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(name.to_string())
        .or_insert_with(|| Arc::new(init()))
        .clone()
}

#[cfg(feature = "metrics")]
fn outcome(value: bool) -> &'static str {
    if value {
        "pass"
    } else {
        "fail"
    }
}
