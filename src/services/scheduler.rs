//! Repeating task scheduling.
//!
//! All periodic work in the crate (countdown ticks, inbox polls) goes
//! through [`RepeatingTask`] so every timer is an explicit, cancellable
//! value instead of an ad-hoc spawned loop. Elapsed time is always derived
//! from stored timestamps by the callers, never from tick counts.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Handle to a task running on a fixed interval.
///
/// The task fires immediately on spawn and then once per period. Dropping
/// the handle cancels the task; an in-flight iteration is cancelled at its
/// next await point.
pub struct RepeatingTask {
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    /// Spawns `task` on a fixed `period`.
    pub fn spawn<F, Fut>(period: Duration, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task().await;
            }
        });
        Self { handle }
    }

    /// Cancels the task.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
