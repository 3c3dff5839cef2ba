//! Collaborator contracts consumed by the monitor engine.
//!
//! The engine orchestrates; everything that touches git internals, the
//! platform watcher, or persistence lives behind these traits. Implementations
//! ship in the [`crate::fs`], [`crate::git`], [`crate::store`], and
//! [`crate::fetch`] modules, and tests substitute their own.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::repository::RepositorySnapshot;

/// Callback carrying a freshly resolved repository snapshot.
pub type SnapshotCallback = Arc<dyn Fn(RepositorySnapshot) + Send + Sync>;

/// Callback carrying a repository path.
pub type PathCallback = Arc<dyn Fn(PathBuf) + Send + Sync>;

/// Supplies the ordered list of root directories to scan and watch.
pub trait PathProvider: Send + Sync {
    fn roots(&self) -> Vec<PathBuf>;
}

/// Resolves a path to a repository snapshot.
///
/// Infallible by contract: any failure is encoded as a not-found snapshot,
/// never surfaced as an error. May be slow and must be callable concurrently
/// from arbitrary threads.
pub trait RepositoryReader: Send + Sync {
    fn read(&self, path: &Path) -> RepositorySnapshot;
}

/// Engine-side sink a detector reports into.
#[derive(Clone)]
pub struct DetectorSink {
    on_add_or_change: SnapshotCallback,
    on_delete: PathCallback,
}

impl DetectorSink {
    #[must_use]
    pub fn new(on_add_or_change: SnapshotCallback, on_delete: PathCallback) -> Self {
        Self {
            on_add_or_change,
            on_delete,
        }
    }

    /// Report a repository that appeared or changed under the watched root.
    pub fn add_or_change(&self, repository: RepositorySnapshot) {
        (self.on_add_or_change)(repository);
    }

    /// Report a repository marker disappearing under the watched root.
    ///
    /// "Delete" means the repository marker vanished, not the root directory
    /// itself being removed.
    pub fn delete(&self, path: PathBuf) {
        (self.on_delete)(path);
    }
}

/// Watches one root path for repositories appearing or disappearing.
///
/// `stop()` must not return until no further sink callback can fire; the
/// engine relies on this instead of a cancellation token.
pub trait RepositoryDetector: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Creates one detector per configured root.
pub trait DetectorFactory: Send + Sync {
    fn create(
        &self,
        root: &Path,
        settle: Duration,
        sink: DetectorSink,
    ) -> Box<dyn RepositoryDetector>;
}

/// Engine-side sink an observer reports into.
#[derive(Clone)]
pub struct ObserverSink {
    on_change: PathCallback,
}

impl ObserverSink {
    #[must_use]
    pub fn new(on_change: PathCallback) -> Self {
        Self { on_change }
    }

    /// Report a change inside the observed repository.
    pub fn change(&self, path: PathBuf) {
        (self.on_change)(path);
    }
}

/// Watches one known repository for internal changes.
///
/// Same blocking-stop contract as [`RepositoryDetector`]; dropping the
/// observer releases the underlying watch resources.
pub trait RepositoryObserver: Send + Sync {
    fn start(&self);
    fn stop(&self);
}

/// Creates one observer per known repository.
pub trait ObserverFactory: Send + Sync {
    fn create(
        &self,
        repository: &RepositorySnapshot,
        settle: Duration,
        sink: ObserverSink,
    ) -> Box<dyn RepositoryObserver>;
}

/// Persists the known repository path list across restarts.
///
/// Read once at startup, overwritten on each flush. Persistence faults are
/// the implementation's responsibility; the engine neither sees nor retries
/// them.
pub trait RepositoryStore: Send + Sync {
    fn get(&self) -> Vec<PathBuf>;
    fn set(&self, paths: &[PathBuf]);
}

/// Gate for an independent background fetch activity.
pub trait FetchToggle: Send + Sync {
    fn set_active(&self, active: bool);
}

/// Path provider over a fixed root list.
#[derive(Debug, Clone)]
pub struct StaticPathProvider {
    roots: Vec<PathBuf>,
}

impl StaticPathProvider {
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

impl PathProvider for StaticPathProvider {
    fn roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_static_path_provider_preserves_order() {
        let provider = StaticPathProvider::new(vec![
            PathBuf::from("/b"),
            PathBuf::from("/a"),
            PathBuf::from("/c"),
        ]);

        assert_eq!(
            provider.roots(),
            vec![PathBuf::from("/b"), PathBuf::from("/a"), PathBuf::from("/c")]
        );
    }

    #[test]
    fn test_detector_sink_routes_callbacks() {
        let changes = Arc::new(AtomicUsize::new(0));
        let deletes = Arc::new(AtomicUsize::new(0));

        let changes_clone = Arc::clone(&changes);
        let deletes_clone = Arc::clone(&deletes);
        let sink = DetectorSink::new(
            Arc::new(move |_| {
                changes_clone.fetch_add(1, Ordering::SeqCst);
            }),
            Arc::new(move |_| {
                deletes_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        sink.add_or_change(RepositorySnapshot::found(
            PathBuf::from("/repos/a"),
            "a",
            "main",
        ));
        sink.delete(PathBuf::from("/repos/a"));
        sink.delete(PathBuf::from("/repos/b"));

        assert_eq!(changes.load(Ordering::SeqCst), 1);
        assert_eq!(deletes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_observer_sink_carries_path() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = ObserverSink::new(Arc::new(move |path| {
            seen_clone.lock().unwrap().push(path);
        }));

        sink.change(PathBuf::from("/repos/a"));

        assert_eq!(seen.lock().unwrap().as_slice(), [PathBuf::from("/repos/a")]);
    }
}
