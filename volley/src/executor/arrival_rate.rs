use super::{drain, iteration, reap, ActiveVu, ExecutorOutcome};
use crate::hook::RUN_HOOK;
use crate::metric::Registry;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};
use volley_core::{ConstantArrivalRate, DROPPED_ITERATIONS};

/// Start `config.rate` iterations per `config.time_unit`, each on its own task, regardless of how
/// long earlier iterations take. An iteration which finds every VU busy is dropped.
pub(crate) async fn run_arrival_rate<T, F>(
    scenario: T,
    config: &ConstantArrivalRate,
    graceful_stop: Duration,
    registry: Arc<Registry>,
) -> ExecutorOutcome
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    let limiter = rate_limiter(config.period());
    let slots = Arc::new(Semaphore::new(config.max_vus));
    let mut allocated = config.pre_allocated_vus;
    info!(
        "Starting {:.2} iterations/s for {} with {} pre-allocated VUs (max {})",
        config.per_second(),
        humantime::format_duration(config.duration),
        config.pre_allocated_vus,
        config.max_vus,
    );

    let deadline = Instant::now() + config.duration;
    let mut tasks = JoinSet::new();
    let mut dropped = 0u64;
    let mut interrupted = 0;

    loop {
        tokio::select! {
            _ = limiter.until_ready() => {}
            _ = tokio::time::sleep_until(deadline) => break,
        }

        interrupted += reap(&mut tasks);

        let Ok(slot) = slots.clone().try_acquire_owned() else {
            dropped += 1;
            registry.counter(DROPPED_ITERATIONS, 1);
            if dropped == 1 {
                warn!(
                    "All {} VUs are busy; iterations are being dropped",
                    config.max_vus
                );
            }
            continue;
        };

        let in_use = config.max_vus - slots.available_permits();
        if in_use > allocated {
            allocated = in_use;
            debug!("Allocated VU #{allocated}");
        }

        let vu = ActiveVu::start(registry.clone(), Some(slot));
        let fut = scenario();
        let hook = registry.clone();
        tasks.spawn(
            RUN_HOOK
                .scope(hook.clone(), async move {
                    let _vu = vu;
                    iteration(fut, &hook).await;
                })
                .in_current_span(),
        );
    }

    if dropped > 0 {
        warn!("{dropped} iterations dropped for lack of VUs");
    }

    interrupted += drain(&mut tasks, graceful_stop).await;

    ExecutorOutcome {
        peak_vus: allocated,
        interrupted_iterations: interrupted,
    }
}

fn rate_limiter(period: Duration) -> DefaultDirectRateLimiter {
    let quota = Quota::with_period(period).unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX));
    RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use volley_core::ITERATIONS;

    fn config(rate: u32, millis: u64) -> ConstantArrivalRate {
        ConstantArrivalRate::new(NonZeroU32::new(rate).unwrap(), Duration::from_millis(millis))
    }

    #[tracing_test::traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(10_000)]
    async fn starts_iterations_at_the_configured_rate() {
        let registry = Arc::new(Registry::default());
        let outcome = run_arrival_rate(
            || async {},
            &config(100, 1_000).vus(2, 10),
            Duration::from_secs(1),
            registry.clone(),
        )
        .await;

        let iterations = registry.snapshot().counters[ITERATIONS];
        assert!((85..=102).contains(&iterations), "{iterations}");
        assert_eq!(outcome.interrupted_iterations, 0);
        assert!((2..=3).contains(&outcome.peak_vus), "{}", outcome.peak_vus);
    }

    #[tracing_test::traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(10_000)]
    async fn rate_does_not_depend_on_iteration_latency() {
        let registry = Arc::new(Registry::default());
        let outcome = run_arrival_rate(
            || async { tokio::time::sleep(Duration::from_millis(200)).await },
            &config(50, 1_000).vus(1, 50),
            Duration::from_secs(2),
            registry.clone(),
        )
        .await;

        let snapshot = registry.snapshot();
        let iterations = snapshot.counters[ITERATIONS];
        assert!((42..=52).contains(&iterations), "{iterations}");
        assert!(!snapshot.counters.contains_key(DROPPED_ITERATIONS));
        // 50/s with 200ms iterations keeps about ten VUs busy.
        assert!(outcome.peak_vus >= 8 && outcome.peak_vus <= 14, "{}", outcome.peak_vus);
    }

    #[tracing_test::traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(10_000)]
    async fn drops_iterations_when_vus_are_exhausted() {
        let registry = Arc::new(Registry::default());
        run_arrival_rate(
            || async { tokio::time::sleep(Duration::from_secs(1)).await },
            &config(40, 500).vus(1, 2),
            Duration::from_secs(2),
            registry.clone(),
        )
        .await;

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.counters[ITERATIONS], 2);
        assert!(snapshot.counters[DROPPED_ITERATIONS] >= 10);
        assert!(logs_contain("iterations are being dropped"));
    }

    #[tracing_test::traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(10_000)]
    async fn interrupts_iterations_after_graceful_stop() {
        let registry = Arc::new(Registry::default());
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        let outcome = run_arrival_rate(
            move || {
                let counter = counter.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            },
            &config(10, 300).vus(5, 5),
            Duration::from_millis(100),
            registry.clone(),
        )
        .await;

        assert!(outcome.interrupted_iterations >= 3);
        assert_eq!(finished.load(Ordering::Relaxed), 0);
        assert!(!registry.snapshot().counters.contains_key(ITERATIONS));
        assert_eq!(registry.active_vus(), 0);
    }

    #[test]
    fn max_vus_limit_matches_the_semaphore() {
        assert_eq!(volley_core::MAX_VUS, Semaphore::MAX_PERMITS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ntest::timeout(10_000)]
    async fn iterations_record_into_the_run() {
        let registry = Arc::new(Registry::default());
        run_arrival_rate(
            || async { metric::rate("errors", false) },
            &config(20, 250).vus(1, 1),
            Duration::from_secs(1),
            registry.clone(),
        )
        .await;

        let (passes, fails) = registry.snapshot().rates["errors"];
        assert_eq!(passes, 0);
        assert!(fails >= 3);
    }
}
