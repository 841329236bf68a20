use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A recurring timer started by [`spawn_every`]. Dropping the handle stops
/// the timer.
#[derive(Debug)]
pub struct PollingHandle {
    task: JoinHandle<()>,
}

impl PollingHandle {
    /// Stop scheduling new runs. Runs already started are left to finish.
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run `run` every `period`, first one period from now. Each run is spawned
/// as its own task so a slow run never delays the next tick.
pub fn spawn_every<F, Fut>(period: Duration, name: &'static str, run: F) -> PollingHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    // `interval` panics on a zero period.
    let period = period.max(Duration::from_millis(1));
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval completes immediately.
        ticker.tick().await;
        tracing::info!(task = name, interval_secs = period.as_secs_f64(), "periodic task started");
        loop {
            ticker.tick().await;
            tokio::spawn(run());
        }
    });
    PollingHandle { task }
}
