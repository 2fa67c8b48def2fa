use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stampede::exec::{BuildExecutor, BuildFuture, BuildOutcome};

/// A fake executor that:
/// - records which targets were "built", in order
/// - reports `Failed(1)` for targets in its failing set, success otherwise
/// - optionally sleeps per target to let other minions interleave.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    built: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, target: &str) -> Self {
        self.failing.insert(target.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared log of attempted builds, including failed ones.
    pub fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.built)
    }

    pub fn built(&self) -> Vec<String> {
        self.built.lock().unwrap().clone()
    }
}

impl BuildExecutor for RecordingExecutor {
    fn build<'a>(&'a mut self, target: &'a str) -> BuildFuture<'a> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.built.lock().unwrap().push(target.to_string());
            if self.failing.contains(target) {
                Ok(BuildOutcome::Failed(1))
            } else {
                Ok(BuildOutcome::Success)
            }
        })
    }
}
