use crate::{ConfigError, Threshold, DEFAULT_GRACEFUL_STOP, DEFAULT_TIME_UNIT, MAX_VUS};
use std::num::NonZeroU32;
use std::time::Duration;

#[doc(hidden)]
#[derive(Clone, Debug)]
pub struct ScenarioConfig {
    pub name: String,
    pub executor: Option<Executor>,
    pub thresholds: Vec<Threshold>,
    pub graceful_stop: Duration,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            executor: None,
            thresholds: vec![],
            graceful_stop: DEFAULT_GRACEFUL_STOP,
        }
    }

    pub fn validate(&self) -> Result<&Executor, ConfigError> {
        let executor = self
            .executor
            .as_ref()
            .ok_or_else(|| ConfigError::MissingExecutor(self.name.clone()))?;

        match executor {
            Executor::ConstantArrivalRate(car) => {
                if car.time_unit.is_zero() {
                    return Err(ConfigError::ZeroTimeUnit);
                }
                if car.period().is_zero() {
                    return Err(ConfigError::RateTooHigh);
                }
                if car.duration.is_zero() {
                    return Err(ConfigError::ZeroDuration);
                }
                if car.max_vus == 0 {
                    return Err(ConfigError::ZeroMaxVus);
                }
                if car.max_vus > MAX_VUS {
                    return Err(ConfigError::TooManyVus(car.max_vus));
                }
                if car.pre_allocated_vus > car.max_vus {
                    return Err(ConfigError::PreAllocatedExceedsMax {
                        pre_allocated: car.pre_allocated_vus,
                        max: car.max_vus,
                    });
                }
            }
            Executor::RampingVus(ramp) => {
                if ramp.stages.is_empty() {
                    return Err(ConfigError::NoStages);
                }
            }
        }

        Ok(executor)
    }
}

/// How iterations of a scenario are scheduled.
#[derive(Clone, Debug, PartialEq)]
pub enum Executor {
    /// Start iterations at a fixed rate, independent of how long they take.
    ConstantArrivalRate(ConstantArrivalRate),
    /// Run a varying number of looping VUs following a list of stages.
    RampingVus(RampingVus),
}

impl Executor {
    /// Time spent issuing new iterations, excluding the graceful stop.
    pub fn duration(&self) -> Duration {
        match self {
            Executor::ConstantArrivalRate(car) => car.duration,
            Executor::RampingVus(ramp) => ramp.total_duration(),
        }
    }

    /// Highest number of VUs the executor may run at once.
    pub fn peak_vus(&self) -> usize {
        match self {
            Executor::ConstantArrivalRate(car) => car.max_vus,
            Executor::RampingVus(ramp) => ramp.peak_vus(),
        }
    }
}

impl From<ConstantArrivalRate> for Executor {
    fn from(value: ConstantArrivalRate) -> Self {
        Executor::ConstantArrivalRate(value)
    }
}

impl From<RampingVus> for Executor {
    fn from(value: RampingVus) -> Self {
        Executor::RampingVus(value)
    }
}

/// `rate` iterations are started every `time_unit` for `duration`.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantArrivalRate {
    pub rate: NonZeroU32,
    pub time_unit: Duration,
    pub duration: Duration,
    pub pre_allocated_vus: usize,
    pub max_vus: usize,
}

impl ConstantArrivalRate {
    pub fn new(rate: NonZeroU32, duration: Duration) -> Self {
        Self {
            rate,
            time_unit: DEFAULT_TIME_UNIT,
            duration,
            pre_allocated_vus: 1,
            max_vus: 1,
        }
    }

    pub fn time_unit(mut self, time_unit: Duration) -> Self {
        self.time_unit = time_unit;
        self
    }

    /// Sets the VU pool bounds. VUs beyond `pre_allocated` are created on demand up to `max`.
    pub fn vus(mut self, pre_allocated: usize, max: usize) -> Self {
        self.pre_allocated_vus = pre_allocated;
        self.max_vus = max;
        self
    }

    /// Gap between two consecutive iteration starts.
    pub fn period(&self) -> Duration {
        self.time_unit / self.rate.get()
    }

    /// Iterations a run would start if no VU ever ran out.
    pub fn expected_iterations(&self) -> u64 {
        (self.rate.get() as f64 * self.duration.as_secs_f64() / self.time_unit.as_secs_f64())
            as u64
    }

    /// Arrival rate normalised to iterations per second.
    pub fn per_second(&self) -> f64 {
        self.rate.get() as f64 / self.time_unit.as_secs_f64()
    }
}

/// A time-boxed target concurrency level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stage {
    pub duration: Duration,
    pub target: usize,
}

impl Stage {
    pub fn new(duration: Duration, target: usize) -> Self {
        Self { duration, target }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RampingVus {
    pub start_vus: usize,
    pub stages: Vec<Stage>,
}

impl RampingVus {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            start_vus: 0,
            stages,
        }
    }

    pub fn start_vus(mut self, start_vus: usize) -> Self {
        self.start_vus = start_vus;
        self
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    pub fn peak_vus(&self) -> usize {
        self.stages
            .iter()
            .map(|s| s.target)
            .max()
            .unwrap_or(0)
            .max(self.start_vus)
    }

    /// VU count the profile asks for `elapsed` into the run.
    ///
    /// Each stage moves linearly from the previous stage's target (or `start_vus`) to its own
    /// target. Past the last stage the final target holds.
    pub fn target_at(&self, elapsed: Duration) -> usize {
        let mut from = self.start_vus;
        let mut remaining = elapsed;

        for stage in &self.stages {
            if remaining < stage.duration {
                let progress = remaining.as_secs_f64() / stage.duration.as_secs_f64();
                let delta = stage.target as f64 - from as f64;
                return (from as f64 + delta * progress).round() as usize;
            }
            remaining -= stage.duration;
            from = stage.target;
        }

        from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn ramp() -> RampingVus {
        RampingVus::new(vec![
            Stage::new(secs(30), 10),
            Stage::new(secs(60), 20),
            Stage::new(secs(30), 0),
        ])
    }

    #[test]
    fn ramp_is_exact_at_stage_boundaries() {
        let ramp = ramp();
        assert_eq!(ramp.target_at(secs(0)), 0);
        assert_eq!(ramp.target_at(secs(30)), 10);
        assert_eq!(ramp.target_at(secs(90)), 20);
        assert_eq!(ramp.target_at(secs(120)), 0);
    }

    #[test]
    fn ramp_interpolates_within_a_stage() {
        let ramp = ramp();
        assert_eq!(ramp.target_at(secs(15)), 5);
        assert_eq!(ramp.target_at(secs(60)), 15);
        assert_eq!(ramp.target_at(secs(105)), 10);
    }

    #[test]
    fn ramp_holds_the_last_target() {
        let ramp = RampingVus::new(vec![Stage::new(secs(10), 4)]).start_vus(2);
        assert_eq!(ramp.target_at(secs(0)), 2);
        assert_eq!(ramp.target_at(secs(5)), 3);
        assert_eq!(ramp.target_at(secs(500)), 4);
        assert_eq!(ramp.peak_vus(), 4);
        assert_eq!(ramp.total_duration(), secs(10));
    }

    #[test]
    fn zero_length_stage_jumps() {
        let ramp = RampingVus::new(vec![Stage::new(secs(0), 8), Stage::new(secs(10), 8)]);
        assert_eq!(ramp.target_at(secs(0)), 8);
    }

    #[test]
    fn arrival_rate_period() {
        let car = ConstantArrivalRate::new(NonZeroU32::new(40).unwrap(), secs(600));
        assert_eq!(car.period(), Duration::from_millis(25));
        assert_eq!(car.expected_iterations(), 24_000);

        let car = car.time_unit(Duration::from_secs(60));
        assert_eq!(car.period(), Duration::from_millis(1_500));
        assert_eq!(car.expected_iterations(), 400);
    }

    #[test]
    fn validation() {
        let mut config = ScenarioConfig::new("s");
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingExecutor("s".to_string()))
        );

        let car = ConstantArrivalRate::new(NonZeroU32::new(1).unwrap(), secs(1));
        config.executor = Some(car.clone().vus(5, 2).into());
        assert_eq!(
            config.validate(),
            Err(ConfigError::PreAllocatedExceedsMax {
                pre_allocated: 5,
                max: 2
            })
        );

        config.executor = Some(car.clone().vus(0, 0).into());
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxVus));

        config.executor = Some(car.clone().vus(1, usize::MAX).into());
        assert_eq!(config.validate(), Err(ConfigError::TooManyVus(usize::MAX)));

        config.executor = Some(car.clone().vus(1, MAX_VUS).into());
        assert!(config.validate().is_ok());

        config.executor = Some(car.clone().time_unit(Duration::ZERO).into());
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeUnit));

        config.executor = Some(RampingVus::new(vec![]).into());
        assert_eq!(config.validate(), Err(ConfigError::NoStages));

        config.executor = Some(car.vus(1, 4).into());
        assert!(config.validate().is_ok());
    }
}
