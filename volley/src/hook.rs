use crate::metric::Registry;
use std::sync::Arc;

tokio::task_local! {
    pub(crate) static RUN_HOOK: Arc<Registry>;
}

/// Runs `f` against the registry of the scenario the current task belongs to.
///
/// Returns `None` (and logs) when called outside of a running scenario.
pub(crate) fn with_registry<R>(f: impl FnOnce(&Registry) -> R) -> Option<R> {
    match RUN_HOOK.try_with(|registry| f(registry)) {
        Ok(res) => Some(res),
        Err(_) => {
            tracing::error!("No hook available; metrics are only recorded inside a scenario run.");
            None
        }
    }
}
