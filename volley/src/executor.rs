mod arrival_rate;
mod ramping;

pub(crate) use arrival_rate::run_arrival_rate;
pub(crate) use ramping::run_ramping;

use crate::metric::Registry;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinSet;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{ITERATIONS, ITERATION_DURATION};

pub(crate) struct ExecutorOutcome {
    pub peak_vus: usize,
    pub interrupted_iterations: u64,
}

/// A busy VU. Keeps the run's VU gauge accurate even if the iteration panics.
struct ActiveVu {
    registry: Arc<Registry>,
    _slot: Option<OwnedSemaphorePermit>,
}

impl ActiveVu {
    fn start(registry: Arc<Registry>, slot: Option<OwnedSemaphorePermit>) -> Self {
        registry.vu_started();
        Self {
            registry,
            _slot: slot,
        }
    }
}

impl Drop for ActiveVu {
    fn drop(&mut self) {
        self.registry.vu_stopped();
    }
}

async fn iteration<F>(fut: F, registry: &Registry)
where
    F: Future<Output = ()>,
{
    let start = Instant::now();
    fut.await;
    registry.counter(ITERATIONS, 1);
    registry.trend(ITERATION_DURATION, start.elapsed());
}

/// Collect tasks that already finished. Returns how many of them panicked.
fn reap(tasks: &mut JoinSet<()>) -> u64 {
    let mut panicked = 0;
    while let Some(res) = tasks.try_join_next() {
        panicked += panicked_count(res);
    }
    panicked
}

/// Give running tasks `graceful_stop` to finish, then abort the rest. Returns the number of
/// iterations that did not complete.
async fn drain(tasks: &mut JoinSet<()>, graceful_stop: Duration) -> u64 {
    let mut interrupted = 0;

    let finished = tokio::time::timeout(graceful_stop, async {
        while let Some(res) = tasks.join_next().await {
            interrupted += panicked_count(res);
        }
    })
    .await;

    if finished.is_err() {
        let cut_short = interrupt(tasks).await;
        warn!("Graceful stop of {graceful_stop:?} elapsed; interrupted {cut_short} iterations");
        interrupted += cut_short;
    }

    interrupted
}

/// Abort every task still running. Tasks that already ended are joined first so only iterations
/// actually cut short (or panicked) are counted.
async fn interrupt(tasks: &mut JoinSet<()>) -> u64 {
    let panicked = reap(tasks);
    let remaining = tasks.len() as u64;
    tasks.abort_all();
    while tasks.join_next().await.is_some() {}
    panicked + remaining
}

fn panicked_count(res: Result<(), tokio::task::JoinError>) -> u64 {
    match res {
        Err(err) if err.is_panic() => {
            error!("Iteration panicked: {err}");
            1
        }
        _ => 0,
    }
}
