use crate::hook::with_registry;

/// A set of named boolean outcomes for one iteration.
///
/// Building the set is pure; outcomes only reach the run's metrics on [`Checks::record`], so
/// predicates can be unit tested without a running scenario.
///
/// # Example
/// ```
/// use volley::check::Checks;
///
/// let status = 200;
/// let checks = Checks::new()
///     .check("status is 200", status == 200)
///     .check("status is not 5xx", status < 500);
/// assert!(checks.passed());
/// ```
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Checks {
    results: Vec<(&'static str, bool)>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(mut self, name: &'static str, passed: bool) -> Self {
        self.results.push((name, passed));
        self
    }

    /// True when every check passed. An empty set passes.
    pub fn passed(&self) -> bool {
        self.results.iter().all(|(_, passed)| *passed)
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.results
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, passed)| *passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.results
            .iter()
            .filter(|(_, passed)| !passed)
            .map(|(name, _)| *name)
    }

    pub fn results(&self) -> &[(&'static str, bool)] {
        &self.results
    }

    /// Record every outcome into the `checks` metric of the current run and return the
    /// combined verdict.
    pub fn record(&self) -> bool {
        with_registry(|registry| {
            for (name, passed) in &self.results {
                registry.check(name, *passed);
            }
        });
        self.passed()
    }
}
