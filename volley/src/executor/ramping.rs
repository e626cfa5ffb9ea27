use super::{drain, iteration, reap, ActiveVu, ExecutorOutcome};
use crate::hook::RUN_HOOK;
use crate::metric::Registry;
use crate::timer::Timer;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};
use volley_core::{RampingVus, RAMP_TICK};

/// Run looping VUs whose count follows the stage profile. VUs removed during a ramp-down finish
/// their current iteration before exiting.
pub(crate) async fn run_ramping<T, F>(
    scenario: T,
    config: &RampingVus,
    graceful_stop: Duration,
    registry: Arc<Registry>,
) -> ExecutorOutcome
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    let total = config.total_duration();
    info!(
        "Ramping VUs over {} stages for {} (start {}, peak {})",
        config.stages.len(),
        humantime::format_duration(total),
        config.start_vus,
        config.peak_vus(),
    );

    let mut tasks = JoinSet::new();
    let mut active: Vec<Arc<VuControl>> = vec![];
    // Asked to stop, possibly still finishing an iteration.
    let mut stopping: Vec<Arc<VuControl>> = vec![];
    let mut interrupted = 0;
    let mut current_stage = None;

    let mut timer = Timer::new(RAMP_TICK).await;
    trace!("Ramp tick every {timer}");
    let mut elapsed = Duration::ZERO;
    loop {
        let stage = stage_at(config, elapsed);
        if stage != current_stage {
            if let Some(idx) = stage {
                let s = &config.stages[idx];
                info!(
                    "Stage {}/{}: {} VUs over {}",
                    idx + 1,
                    config.stages.len(),
                    s.target,
                    humantime::format_duration(s.duration)
                );
            }
            current_stage = stage;
        }

        let target = config.target_at(elapsed);
        stopping.retain(|vu| !vu.exited());
        while active.len() < target {
            if let Some(vu) = stopping.pop() {
                if vu.resume() {
                    trace!("Resumed a stopping VU");
                    active.push(vu);
                }
                continue;
            }

            let control = Arc::new(VuControl::default());
            let vu = ActiveVu::start(registry.clone(), None);
            tasks.spawn(
                RUN_HOOK
                    .scope(
                        registry.clone(),
                        vu_loop(scenario.clone(), control.clone(), vu),
                    )
                    .in_current_span(),
            );
            active.push(control);
        }
        while active.len() > target {
            if let Some(vu) = active.pop() {
                vu.stop();
                stopping.push(vu);
            }
        }

        interrupted += reap(&mut tasks);

        if elapsed >= total {
            break;
        }
        elapsed = timer.tick().await;
    }

    debug!("Ramp complete after {:?}; stopping VUs", timer.elapsed());
    for vu in active.drain(..) {
        vu.stop();
    }
    interrupted += drain(&mut tasks, graceful_stop).await;

    ExecutorOutcome {
        peak_vus: registry.peak_vus(),
        interrupted_iterations: interrupted,
    }
}

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const EXITED: u8 = 2;

/// Lifecycle of a looping VU. A VU asked to stop can be resumed until it notices the request
/// between two iterations and exits.
#[derive(Debug)]
struct VuControl {
    state: AtomicU8,
}

impl Default for VuControl {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(RUNNING),
        }
    }
}

impl VuControl {
    fn stop(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Cancel a pending stop. Fails once the VU has exited.
    fn resume(&self) -> bool {
        self.state
            .compare_exchange(STOPPING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Called by the VU between iterations; true when it should exit.
    fn try_exit(&self) -> bool {
        self.state
            .compare_exchange(STOPPING, EXITED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn exited(&self) -> bool {
        self.state.load(Ordering::Acquire) == EXITED
    }
}

async fn vu_loop<T, F>(scenario: T, control: Arc<VuControl>, vu: ActiveVu)
where
    T: Fn() -> F,
    F: Future<Output = ()>,
{
    while !control.try_exit() {
        iteration(scenario(), &vu.registry).await;
        // NOTE: An iteration without an await point would otherwise never yield to the runtime.
        tokio::task::yield_now().await;
    }
}

fn stage_at(config: &RampingVus, elapsed: Duration) -> Option<usize> {
    let mut end = Duration::ZERO;
    for (idx, stage) in config.stages.iter().enumerate() {
        end += stage.duration;
        if elapsed < end {
            return Some(idx);
        }
    }
    None
}
