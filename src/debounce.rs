use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Trailing-edge debounce: each `schedule` restarts the quiet period and
/// only the last scheduled job runs once the period elapses.
///
/// Once the delay has elapsed the job is detached onto its own task, so a
/// later `schedule` or `cancel` never aborts work that has already started.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: Mutex::new(None) }
    }

    pub fn schedule<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(job);
        });
        if let Some(prev) = self.pending.lock().replace(handle) {
            prev.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(prev) = self.pending.lock().take() {
            prev.abort();
        }
    }

    /// True while a job is still waiting out its quiet period.
    pub fn is_pending(&self) -> bool {
        self.pending.lock().as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(h) = self.pending.get_mut().take() {
            h.abort();
        }
    }
}
