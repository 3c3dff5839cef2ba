//! Registry of live per-repository observers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::ports::RepositoryObserver;

/// Tracks the one live observer per known repository path.
///
/// Invariant: never two simultaneous observers for the same path. The
/// check-and-create in [`register_with`](Self::register_with) happens under a
/// single lock acquisition, so discovery callbacks racing on the same path
/// cannot double-watch it.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<HashMap<PathBuf, Box<dyn RepositoryObserver>>>,
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register an observer for a path unless one already exists.
    ///
    /// The factory closure runs while the registry lock is held; it is
    /// expected to create and start the observer so the entry is live the
    /// moment it becomes visible. Returns whether a new observer was created.
    pub fn register_with<F>(&self, path: &Path, create: F) -> bool
    where
        F: FnOnce() -> Box<dyn RepositoryObserver>,
    {
        let mut observers = self.observers.lock().expect("registry lock poisoned");
        if observers.contains_key(path) {
            return false;
        }
        observers.insert(path.to_path_buf(), create());
        true
    }

    /// Remove and return the observer for a path, if present.
    ///
    /// The handle is returned rather than stopped in place so the caller
    /// controls stop ordering without holding the registry lock.
    pub fn remove(&self, path: &Path) -> Option<Box<dyn RepositoryObserver>> {
        self.observers
            .lock()
            .expect("registry lock poisoned")
            .remove(path)
    }

    /// Remove and return every observer. Used on full reset.
    pub fn drain(&self) -> Vec<Box<dyn RepositoryObserver>> {
        self.observers
            .lock()
            .expect("registry lock poisoned")
            .drain()
            .map(|(_, observer)| observer)
            .collect()
    }

    /// Number of live observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.lock().expect("registry lock poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether an observer exists for this path.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.observers
            .lock()
            .expect("registry lock poisoned")
            .contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingObserver {
        stops: Arc<AtomicUsize>,
    }

    impl RepositoryObserver for CountingObserver {
        fn start(&self) {}

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn observer(stops: &Arc<AtomicUsize>) -> Box<dyn RepositoryObserver> {
        Box::new(CountingObserver {
            stops: Arc::clone(stops),
        })
    }

    #[test]
    fn test_register_once_per_path() {
        let registry = ObserverRegistry::new();
        let stops = Arc::new(AtomicUsize::new(0));

        assert!(registry.register_with(Path::new("/repos/a"), || observer(&stops)));
        assert!(!registry.register_with(Path::new("/repos/a"), || observer(&stops)));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_returns_handle() {
        let registry = ObserverRegistry::new();
        let stops = Arc::new(AtomicUsize::new(0));
        registry.register_with(Path::new("/repos/a"), || observer(&stops));

        let handle = registry.remove(Path::new("/repos/a"));
        assert!(handle.is_some());
        assert!(registry.is_empty());

        handle.unwrap().stop();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_missing_path() {
        let registry = ObserverRegistry::new();
        assert!(registry.remove(Path::new("/repos/missing")).is_none());
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = ObserverRegistry::new();
        let stops = Arc::new(AtomicUsize::new(0));
        registry.register_with(Path::new("/repos/a"), || observer(&stops));
        registry.register_with(Path::new("/repos/b"), || observer(&stops));

        let drained = registry.drain();

        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_registration_is_exclusive() {
        let registry = Arc::new(ObserverRegistry::new());
        let created = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let created = Arc::clone(&created);
                let stops = Arc::clone(&stops);
                std::thread::spawn(move || {
                    registry.register_with(Path::new("/repos/contended"), || {
                        created.fetch_add(1, Ordering::SeqCst);
                        observer(&stops)
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }
}
