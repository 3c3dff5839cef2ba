//! Debounced persistence scheduling.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Single re-armable countdown gating persistence.
///
/// Persisting on every discovery would generate excessive I/O while a large
/// initial scan surfaces hundreds of repositories in seconds. Arming cancels
/// any pending flush and restarts the countdown, so the write happens once,
/// after the discovery burst goes quiet for the configured delay. There is
/// never more than one pending flush and the callback never overlaps itself:
/// it contains no await point, so an abort cannot land mid-write.
pub struct FlushScheduler {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl FlushScheduler {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// The configured quiet period.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Re-arm the countdown: cancel any pending flush and start a fresh one.
    ///
    /// Callable from any thread; the countdown runs on the supplied runtime.
    pub fn arm<F>(&self, runtime: &tokio::runtime::Handle, flush: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending.lock().expect("flush lock poisoned");
        if let Some(task) = pending.take() {
            task.abort();
        }

        let delay = self.delay;
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            flush();
        }));
    }

    /// Cancel any pending flush without firing it.
    pub fn cancel(&self) {
        if let Some(task) = self
            .pending
            .lock()
            .expect("flush lock poisoned")
            .take()
        {
            task.abort();
        }
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
