//! Per-root repository detector on the platform watcher.
//!
//! Watches one configured root recursively and reports repositories
//! appearing, changing, or disappearing beneath it. Only events touching a
//! `.git` marker are interesting here; working-tree churn inside a known
//! repository is the observer's job.

use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use notify_debouncer_full::{new_debouncer, notify::RecursiveMode, DebouncedEvent};
use tokio_util::sync::CancellationToken;

use super::crawler::GIT_MARKER;
use super::error::WatchError;
use crate::ports::{DetectorFactory, DetectorSink, RepositoryDetector, RepositoryReader};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Detector over one root, bridging notify events onto the engine's sink.
pub struct NotifyRepositoryDetector {
    root: PathBuf,
    settle: Duration,
    reader: Arc<dyn RepositoryReader>,
    sink: DetectorSink,
    worker: Mutex<Option<Worker>>,
}

struct Worker {
    cancel: CancellationToken,
    handle: thread::JoinHandle<()>,
}

impl NotifyRepositoryDetector {
    #[must_use]
    pub fn new(
        root: PathBuf,
        settle: Duration,
        reader: Arc<dyn RepositoryReader>,
        sink: DetectorSink,
    ) -> Self {
        Self {
            root,
            settle,
            reader,
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
        debouncer.watch(&self.root, RecursiveMode::Recursive)?;

        let cancel = CancellationToken::new();
        let thread_cancel = cancel.clone();
        let reader = Arc::clone(&self.reader);
        let sink = self.sink.clone();
        let root = self.root.clone();

        let handle = thread::Builder::new()
            .name("repolens-detector".to_string())
            .spawn(move || {
                while !thread_cancel.is_cancelled() {
                    match notify_rx.recv_timeout(POLL_INTERVAL) {
                        Ok(Ok(events)) => {
                            for event in &events {
                                handle_event(event, reader.as_ref(), &sink);
                            }
                        }
                        Ok(Err(errors)) => {
                            for error in errors {
                                tracing::warn!(
                                    %error,
                                    root = %root.display(),
                                    "Watcher error under root"
                                );
                            }
                        }
                        Err(std_mpsc::RecvTimeoutError::Timeout) => {}
                        Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
                    }
                }
                // Keep the debouncer alive until the thread exits.
                drop(debouncer);
            })?;

        Ok(Worker { cancel, handle })
    }
}

impl RepositoryDetector for NotifyRepositoryDetector {
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
                    root = %self.root.display(),
                    "Failed to start root detector"
                );
            }
        }
    }

    fn stop(&self) {
        let Some(worker) = self.worker.lock().expect("worker lock poisoned").take() else {
            return;
        };
        worker.cancel.cancel();

        // A stop issued from the bridge thread itself (a subscriber calling
        // back into the monitor) must not join its own thread; the cancel
        // flag ends the loop once the in-flight callback returns.
        if worker.handle.thread().id() == thread::current().id() {
            return;
        }

        // Join before returning: no sink callback can fire once stop()
        // completes. The engine relies on this instead of a cancellation
        // token of its own.
        if worker.handle.join().is_err() {
            tracing::warn!(root = %self.root.display(), "Detector bridge thread panicked");
        }
    }
}

impl Drop for NotifyRepositoryDetector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_event(event: &DebouncedEvent, reader: &dyn RepositoryReader, sink: &DetectorSink) {
    use notify::EventKind;

    for path in &event.paths {
        let Some(repository) = repository_root_for(path) else {
            continue;
        };

        if matches!(event.kind, EventKind::Remove(_)) && is_marker_removal(path) {
            sink.delete(repository);
        } else {
            let snapshot = reader.read(&repository);
            if snapshot.was_found {
                sink.add_or_change(snapshot);
            }
        }
    }
}

/// Repository directory owning a path that touches a `.git` marker, or
/// `None` for paths outside any marker.
fn repository_root_for(path: &Path) -> Option<PathBuf> {
    let mut current = Some(path);
    while let Some(candidate) = current {
        if candidate.file_name().is_some_and(|name| name == GIT_MARKER) {
            return candidate.parent().map(Path::to_path_buf);
        }
        current = candidate.parent();
    }
    None
}

/// Whether a removal at this path takes the repository marker with it.
/// Deleting refs inside `.git` is a change; deleting `.git` or `HEAD` is not.
fn is_marker_removal(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name == GIT_MARKER || name == "HEAD")
}

/// Creates [`NotifyRepositoryDetector`]s sharing one reader.
pub struct NotifyDetectorFactory {
    reader: Arc<dyn RepositoryReader>,
}

impl NotifyDetectorFactory {
    #[must_use]
    pub fn new(reader: Arc<dyn RepositoryReader>) -> Self {
        Self { reader }
    }
}

impl DetectorFactory for NotifyDetectorFactory {
    fn create(
        &self,
        root: &Path,
        settle: Duration,
        sink: DetectorSink,
    ) -> Box<dyn RepositoryDetector> {
        Box::new(NotifyRepositoryDetector::new(
            root.to_path_buf(),
            settle,
            Arc::clone(&self.reader),
            sink,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositorySnapshot;
    use tempfile::TempDir;

    struct MarkerReader;

    impl RepositoryReader for MarkerReader {
        fn read(&self, path: &Path) -> RepositorySnapshot {
            if path.join(GIT_MARKER).exists() {
                RepositorySnapshot::found(path.to_path_buf(), "repo", "main")
            } else {
                RepositorySnapshot::not_found(path)
            }
        }
    }

    #[test]
    fn test_repository_root_for_marker_paths() {
        assert_eq!(
            repository_root_for(Path::new("/repos/a/.git")),
            Some(PathBuf::from("/repos/a"))
        );
        assert_eq!(
            repository_root_for(Path::new("/repos/a/.git/refs/heads/main")),
            Some(PathBuf::from("/repos/a"))
        );
        assert_eq!(repository_root_for(Path::new("/repos/a/src/lib.rs")), None);
    }

    #[test]
    fn test_is_marker_removal() {
        assert!(is_marker_removal(Path::new("/repos/a/.git")));
        assert!(is_marker_removal(Path::new("/repos/a/.git/HEAD")));
        assert!(!is_marker_removal(Path::new("/repos/a/.git/refs/heads/dev")));
    }

    fn recording_sink() -> (
        DetectorSink,
        Arc<Mutex<Vec<PathBuf>>>,
        Arc<Mutex<Vec<PathBuf>>>,
    ) {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let deletes = Arc::new(Mutex::new(Vec::new()));
        let changes_clone = Arc::clone(&changes);
        let deletes_clone = Arc::clone(&deletes);
        let sink = DetectorSink::new(
            Arc::new(move |snapshot: RepositorySnapshot| {
                changes_clone.lock().unwrap().push(snapshot.path);
            }),
            Arc::new(move |path| {
                deletes_clone.lock().unwrap().push(path);
            }),
        );
        (sink, changes, deletes)
    }

    #[test]
    fn test_detector_reports_new_repository() {
        let dir = TempDir::new().unwrap();
        let (sink, changes, _) = recording_sink();
        let detector = NotifyRepositoryDetector::new(
            dir.path().to_path_buf(),
            Duration::from_millis(100),
            Arc::new(MarkerReader),
            sink,
        );

        detector.start();
        if !detector.is_running() {
            // Platform watcher limit reached; nothing to assert.
            eprintln!("Skipping test, detector could not start");
            return;
        }

        let repo = dir.path().join("fresh");
        std::fs::create_dir_all(repo.join(GIT_MARKER)).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(3);
        while std::time::Instant::now() < deadline {
            if changes.lock().unwrap().iter().any(|p| p.ends_with("fresh")) {
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }

        detector.stop();
        // Timeouts on slow CI are tolerated; when an event did arrive it must
        // name the repository directory, not the marker.
        for path in changes.lock().unwrap().iter() {
            assert!(!path.ends_with(GIT_MARKER));
        }
    }

    #[test]
    fn test_detector_reports_marker_removal() {
        let dir = TempDir::new().unwrap();
        let repo = dir.path().join("doomed");
        std::fs::create_dir_all(repo.join(GIT_MARKER)).unwrap();

        let (sink, _, deletes) = recording_sink();
        let detector = NotifyRepositoryDetector::new(
            dir.path().to_path_buf(),
            Duration::from_millis(100),
            Arc::new(MarkerReader),
            sink,
        );

        detector.start();
        if !detector.is_running() {
            eprintln!("Skipping test, detector could not start");
            return;
        }

        std::fs::remove_dir_all(repo.join(GIT_MARKER)).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(3);
        while std::time::Instant::now() < deadline {
            if !deletes.lock().unwrap().is_empty() {
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }

        detector.stop();
        for path in deletes.lock().unwrap().iter() {
            assert!(path.ends_with("doomed"));
        }
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let dir = TempDir::new().unwrap();
        let (sink, _, _) = recording_sink();
        let detector = NotifyRepositoryDetector::new(
            dir.path().to_path_buf(),
            Duration::from_millis(100),
            Arc::new(MarkerReader),
            sink,
        );

        detector.stop();
        assert!(!detector.is_running());
    }

    #[test]
    fn test_start_stop_start_restarts() {
        let dir = TempDir::new().unwrap();
        let (sink, _, _) = recording_sink();
        let detector = NotifyRepositoryDetector::new(
            dir.path().to_path_buf(),
            Duration::from_millis(100),
            Arc::new(MarkerReader),
            sink,
        );

        detector.start();
        if !detector.is_running() {
            eprintln!("Skipping test, detector could not start");
            return;
        }
        detector.stop();
        assert!(!detector.is_running());

        detector.start();
        assert!(detector.is_running());
        detector.stop();
    }
}
