//! Per-repository observer on the platform watcher.
//!
//! Watches one known repository recursively and reports a single debounced
//! change notification carrying the repository path. Whether the change means
//! an update, a disappearance, or a recovery is the engine's call; the
//! observer only signals that something happened.

use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use notify_debouncer_full::{new_debouncer, notify::RecursiveMode};
use tokio_util::sync::CancellationToken;

use super::error::WatchError;
use crate::ports::{ObserverFactory, ObserverSink, RepositoryObserver};
use crate::repository::RepositorySnapshot;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Observer over one repository, bridging notify events onto the engine's
/// sink.
pub struct NotifyRepositoryObserver {
    path: PathBuf,
    settle: Duration,
    sink: ObserverSink,
    worker: Mutex<Option<Worker>>,
}

struct Worker {
    cancel: CancellationToken,
    handle: thread::JoinHandle<()>,
}

impl NotifyRepositoryObserver {
    #[must_use]
    pub fn new(path: PathBuf, settle: Duration, sink: ObserverSink) -> Self {
        Self {
            path,
            settle,
            sink,
            worker: Mutex::new(None),
        }
    }

    /// Whether the bridge thread is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.lock().expect("worker lock poisoned").is_some()
    }

    fn spawn_worker(&self) -> Result<Worker, WatchError> {
        let (notify_tx, notify_rx) = std_mpsc::channel();

        let mut debouncer = new_debouncer(self.settle, None, move |result| {
            let _ = notify_tx.send(result);
        })?;
        debouncer.watch(&self.path, RecursiveMode::Recursive)?;

        let cancel = CancellationToken::new();
        let thread_cancel = cancel.clone();
        let sink = self.sink.clone();
        let path = self.path.clone();

        let handle = thread::Builder::new()
            .name("repolens-observer".to_string())
            .spawn(move || {
                while !thread_cancel.is_cancelled() {
                    match notify_rx.recv_timeout(POLL_INTERVAL) {
                        Ok(Ok(events)) => {
                            // One debounced batch collapses to one change
                            // signal; the engine re-reads the repository
                            // anyway.
                            if !events.is_empty() {
                                sink.change(path.clone());
                            }
                        }
                        Ok(Err(errors)) => {
                            for error in errors {
                                tracing::warn!(
                                    %error,
                                    path = %path.display(),
                                    "Watcher error in repository"
                                );
                            }
                        }
                        Err(std_mpsc::RecvTimeoutError::Timeout) => {}
                        Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
                drop(debouncer);
            })?;

        Ok(Worker { cancel, handle })
    }
}

impl RepositoryObserver for NotifyRepositoryObserver {
    fn start(&self) {
        let mut worker = self.worker.lock().expect("worker lock poisoned");
        if worker.is_some() {
            return;
        }
        match self.spawn_worker() {
            Ok(spawned) => *worker = Some(spawned),
            Err(error) => {
                tracing::warn!(
                    %error,
                    path = %self.path.display(),
                    "Failed to start repository observer"
                );
            }
        }
    }

    fn stop(&self) {
        let Some(worker) = self.worker.lock().expect("worker lock poisoned").take() else {
            return;
        };
        worker.cancel.cancel();

        // An observer can tear itself down from its own bridge thread (its
        // change signal turned out to be a deletion). The cancel flag ends
        // the loop as soon as the in-flight callback returns; joining here
        // would deadlock on ourselves.
        if worker.handle.thread().id() == thread::current().id() {
            return;
        }

        // Join before returning so no change signal outlives stop().
        if worker.handle.join().is_err() {
            tracing::warn!(path = %self.path.display(), "Observer bridge thread panicked");
        }
    }
}

impl Drop for NotifyRepositoryObserver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Creates [`NotifyRepositoryObserver`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyObserverFactory;

impl ObserverFactory for NotifyObserverFactory {
    fn create(
        &self,
        repository: &RepositorySnapshot,
        settle: Duration,
        sink: ObserverSink,
    ) -> Box<dyn RepositoryObserver> {
        Box::new(NotifyRepositoryObserver::new(
            repository.path.clone(),
            settle,
            sink,
        ))
    }
}
