//! Scenario logic and configuration
use crate::error::ScenarioError;
use crate::executor::{run_arrival_rate, run_ramping};
use crate::metric::Registry;
use crate::summary::summarize;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};
use volley_core::{Executor, RunStatistics, ScenarioConfig, Threshold};

/// Load test scenario structure
///
/// Handler for running scenarios. Not intended for manual creation, use the
/// [`#[scenario]`](volley_macros::scenario) macro which will add these methods to functions.
///
/// Nothing runs until the scenario is awaited.
#[pin_project::pin_project]
pub struct Scenario<T> {
    func: T,
    runner_fut: Option<Pin<Box<dyn Future<Output = Result<RunStatistics, ScenarioError>> + Send>>>,
    config: ScenarioConfig,
}

impl<T> Scenario<T> {
    #[doc(hidden)]
    pub fn new(name: &str, func: T) -> Self {
        Self {
            func,
            runner_fut: None,
            config: ScenarioConfig::new(name),
        }
    }
}

impl<T, F> Future for Scenario<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    type Output = Result<RunStatistics, ScenarioError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let runner = this.runner_fut.get_or_insert_with(|| {
            let func = this.func.clone();
            let config = this.config.clone();
            Box::pin(async move { run_scenario(func, config).await })
        });
        runner.as_mut().poll(cx)
    }
}

pub trait ConfigurableScenario:
    Future<Output = Result<RunStatistics, ScenarioError>> + Sized + Send
{
    fn executor(self, executor: impl Into<Executor>) -> Self;
    fn threshold(self, threshold: Threshold) -> Self;
    fn thresholds(self, thresholds: impl IntoIterator<Item = Threshold>) -> Self;
    fn graceful_stop(self, graceful_stop: Duration) -> Self;
}

impl<T, F> ConfigurableScenario for Scenario<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    /// Choose how iterations are scheduled.
    ///
    /// # Example
    /// ```no_run
    /// use volley::prelude::*;
    /// use std::num::NonZeroU32;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let rate = NonZeroU32::new(40).unwrap();
    ///     let stats = my_scenario()
    ///         .executor(ConstantArrivalRate::new(rate, Duration::from_secs(600)).vus(50, 100))
    ///         .await
    ///         .unwrap();
    ///     println!("{stats}");
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn executor(mut self, executor: impl Into<Executor>) -> Self {
        self.config.executor = Some(executor.into());
        self
    }

    /// Add a pass/fail condition evaluated once the run finishes.
    ///
    /// # Example
    /// ```no_run
    /// use volley::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let stats = my_scenario()
    ///         .executor(RampingVus::new(vec![Stage::new(Duration::from_secs(30), 10)]))
    ///         .threshold(Threshold::parse("http_req_duration", "p(95)<2000")?)
    ///         .await?;
    ///     assert!(stats.passed());
    ///     Ok(())
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn threshold(mut self, threshold: Threshold) -> Self {
        self.config.thresholds.push(threshold);
        self
    }

    fn thresholds(mut self, thresholds: impl IntoIterator<Item = Threshold>) -> Self {
        self.config.thresholds.extend(thresholds);
        self
    }

    /// Time in-flight iterations get to finish once the executor stops issuing new ones.
    /// Defaults to 30s.
    fn graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.config.graceful_stop = graceful_stop;
        self
    }
}

#[instrument(name = "scenario", skip_all, fields(name = config.name))]
pub(crate) async fn run_scenario<T, F>(
    scenario: T,
    config: ScenarioConfig,
) -> Result<RunStatistics, ScenarioError>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send + 'static,
{
    let executor = config.validate()?;
    info!("Running {} with config {:?}", config.name, &config);

    let registry = Arc::new(Registry::default());
    let start = Instant::now();
    let outcome = match executor {
        Executor::ConstantArrivalRate(car) => {
            run_arrival_rate(scenario, car, config.graceful_stop, registry.clone()).await
        }
        Executor::RampingVus(ramp) => {
            run_ramping(scenario, ramp, config.graceful_stop, registry.clone()).await
        }
    };
    let elapsed = start.elapsed();

    let stats = summarize(
        &config.name,
        elapsed,
        outcome,
        registry.snapshot(),
        &config.thresholds,
    );

    for result in stats.thresholds.iter().filter(|t| !t.passed) {
        warn!("Threshold crossed: {}", result.threshold);
    }
    info!(
        "Scenario {} finished after {:?}: {} iterations, {} dropped",
        config.name,
        elapsed,
        stats.iterations(),
        stats.dropped_iterations()
    );

    Ok(stats)
}
