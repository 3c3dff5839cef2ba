//! The repository monitor engine.
//!
//! Coordinates parallel root scans, per-root detectors, per-repository
//! observers, debounced persistence, and the aggregator into one consistent
//! view. Detector and observer callbacks fire from their own threads; the
//! engine serializes all shared state behind the aggregator, registry, and
//! scan locks.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::fs::crawler;
use crate::monitor::aggregator::RepositoryAggregator;
use crate::monitor::event::{MonitorEvent, RecheckMode};
use crate::monitor::flush::FlushScheduler;
use crate::monitor::registry::ObserverRegistry;
use crate::ports::{
    DetectorFactory, DetectorSink, FetchToggle, ObserverFactory, ObserverSink, PathProvider,
    RepositoryDetector, RepositoryObserver, RepositoryReader, RepositoryStore,
};
use crate::repository::RepositorySnapshot;

/// Default quiet period after a first discovery before persistence flushes.
/// Also the settle delay handed to detectors at creation.
pub const DEFAULT_CREATION_SETTLE: Duration = Duration::from_millis(5000);

/// Default settle delay handed to per-repository observers.
pub const DEFAULT_CHANGE_SETTLE: Duration = Duration::from_millis(500);

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Settle delays for the monitor. Fixed at construction; there is no
/// post-`observe()` mutation surface.
#[derive(Debug, Clone, Copy)]
pub struct MonitorTimings {
    pub creation_settle: Duration,
    pub change_settle: Duration,
}

impl Default for MonitorTimings {
    fn default() -> Self {
        Self {
            creation_settle: DEFAULT_CREATION_SETTLE,
            change_settle: DEFAULT_CHANGE_SETTLE,
        }
    }
}

/// Outstanding-root accounting behind the scanning flag.
///
/// Overlapping scan invocations share this counter, so the flag covers their
/// union and flips exactly twice per busy period.
#[derive(Debug, Default)]
struct ScanState {
    outstanding: usize,
    scanning: bool,
}

/// Live monitor over a set of configured roots.
///
/// Cheap to clone; clones share the same engine state.
#[derive(Clone)]
pub struct RepositoryMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    paths: Arc<dyn PathProvider>,
    reader: Arc<dyn RepositoryReader>,
    detector_factory: Arc<dyn DetectorFactory>,
    observer_factory: Arc<dyn ObserverFactory>,
    store: Arc<dyn RepositoryStore>,
    fetch: Arc<dyn FetchToggle>,
    aggregator: RepositoryAggregator,
    observers: ObserverRegistry,
    flush: FlushScheduler,
    detectors: Mutex<Option<Vec<Box<dyn RepositoryDetector>>>>,
    scan: Mutex<ScanState>,
    events: broadcast::Sender<MonitorEvent>,
    timings: MonitorTimings,
    runtime: tokio::runtime::Handle,
}

/// Decrements the outstanding-root counter even if a crawl panics.
struct ScanGuard {
    inner: Arc<MonitorInner>,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.inner.complete_scan_root();
    }
}

impl RepositoryMonitor {
    /// Create a monitor over the given collaborators.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; the engine captures the
    /// ambient runtime handle to drive the flush countdown and store replay.
    #[must_use]
    pub fn new(
        paths: Arc<dyn PathProvider>,
        reader: Arc<dyn RepositoryReader>,
        detector_factory: Arc<dyn DetectorFactory>,
        observer_factory: Arc<dyn ObserverFactory>,
        store: Arc<dyn RepositoryStore>,
        fetch: Arc<dyn FetchToggle>,
        timings: MonitorTimings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MonitorInner {
                paths,
                reader,
                detector_factory,
                observer_factory,
                store,
                fetch,
                aggregator: RepositoryAggregator::new(),
                observers: ObserverRegistry::new(),
                flush: FlushScheduler::new(timings.creation_settle),
                detectors: Mutex::new(None),
                scan: Mutex::new(ScanState::default()),
                events,
                timings,
                runtime: tokio::runtime::Handle::current(),
            }),
        }
    }

    /// Subscribe to change/deletion/scan-state notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.inner.events.subscribe()
    }

    /// Whether at least one root scan is currently outstanding.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.inner.scan.lock().expect("scan lock poisoned").scanning
    }

    /// Ordered snapshot of all currently known repositories.
    #[must_use]
    pub fn repositories(&self) -> Vec<RepositorySnapshot> {
        self.inner.aggregator.repositories()
    }

    /// Ordered list of currently known repository paths.
    #[must_use]
    pub fn known_paths(&self) -> Vec<PathBuf> {
        self.inner.aggregator.paths()
    }

    /// Number of live per-repository observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.observers.len()
    }

    /// Crawl every configured root in parallel, resolving each candidate
    /// through the reader.
    ///
    /// Completes when all root scans complete. Overlapping invocations are
    /// not deduplicated; they share the outstanding-root counter, so the
    /// scanning flag stays up until every in-flight root finishes.
    pub async fn scan_for_repositories(&self) {
        let roots = self.inner.paths.roots();
        if roots.is_empty() {
            tracing::debug!("No roots configured, nothing to scan");
            return;
        }

        self.inner.begin_scan(roots.len());

        let mut scans = JoinSet::new();
        for root in roots {
            let inner = Arc::clone(&self.inner);
            scans.spawn_blocking(move || {
                let _guard = ScanGuard {
                    inner: Arc::clone(&inner),
                };
                let candidates = crawler::collect_repository_candidates(&root);
                tracing::debug!(
                    root = %root.display(),
                    candidates = candidates.len(),
                    "Root crawl finished"
                );
                for candidate in candidates {
                    inner.found_new_repository(&candidate);
                }
            });
        }

        while let Some(result) = scans.join_next().await {
            if let Err(error) = result {
                tracing::warn!(%error, "Root scan task failed");
            }
        }
    }

    /// Start watching.
    ///
    /// The first invocation replays the persisted path list in the background
    /// (found-only, so stale entries are dropped silently) and creates one
    /// detector per configured root that exists as a directory. Later
    /// invocations only restart the existing detectors. Always reactivates
    /// the fetch toggle. Returns immediately; replay and watching proceed in
    /// the background.
    pub fn observe(&self) {
        {
            let mut detectors = self.inner.detectors.lock().expect("detector lock poisoned");
            if detectors.is_none() {
                self.inner.replay_store();
                *detectors = Some(self.inner.create_detectors());
            }
            if let Some(detectors) = detectors.as_ref() {
                for detector in detectors {
                    detector.start();
                }
            }
        }
        self.inner.fetch.set_active(true);
    }

    /// Stop watching roots and deactivate the fetch toggle.
    ///
    /// Per-repository observers deliberately survive so a later `observe()`
    /// resumes cheaply. Returns only after every detector has stopped.
    pub fn stop(&self) {
        self.inner.fetch.set_active(false);
        if let Some(detectors) = self
            .inner
            .detectors
            .lock()
            .expect("detector lock poisoned")
            .as_ref()
        {
            for detector in detectors {
                detector.stop();
            }
        }
    }

    /// Fully resynchronize: stop, destroy every observer, clear the
    /// aggregator, persist the now-empty state immediately, then observe
    /// again.
    pub fn reset(&self) {
        tracing::info!("Resetting repository monitor");
        self.stop();

        for observer in self.inner.observers.drain() {
            observer.stop();
        }
        self.inner.aggregator.clear();

        self.inner.flush.cancel();
        self.inner.persist();

        self.observe();
    }
}

impl MonitorInner {
    fn emit(&self, event: MonitorEvent) {
        // A send only fails when no subscriber exists, which is fine.
        let _ = self.events.send(event);
    }

    fn begin_scan(&self, roots: usize) {
        // Flip decision and emission stay under the scan lock so transitions
        // cannot reorder when scans start and finish near-simultaneously.
        let mut scan = self.scan.lock().expect("scan lock poisoned");
        scan.outstanding += roots;
        let now_scanning = scan.outstanding > 0;
        if now_scanning != scan.scanning {
            scan.scanning = now_scanning;
            self.emit(MonitorEvent::ScanStateChanged(now_scanning));
        }
    }

    fn complete_scan_root(&self) {
        let mut scan = self.scan.lock().expect("scan lock poisoned");
        scan.outstanding = scan.outstanding.saturating_sub(1);
        let now_scanning = scan.outstanding > 0;
        if now_scanning != scan.scanning {
            scan.scanning = now_scanning;
            self.emit(MonitorEvent::ScanStateChanged(now_scanning));
        }
    }

    /// Scan-path discovery: resolve a crawl candidate, routing only found
    /// results onward.
    fn found_new_repository(self: &Arc<Self>, candidate: &Path) {
        let snapshot = self.reader.read(candidate);
        if snapshot.was_found {
            self.change_detected(snapshot);
        }
    }

    /// Resolve a path and route the outcome according to the re-check mode.
    fn check_repository(self: &Arc<Self>, path: &Path, mode: RecheckMode) {
        let snapshot = self.reader.read(path);
        if snapshot.was_found {
            if mode.permits_found() {
                self.change_detected(snapshot);
            }
        } else if mode.permits_not_found() {
            self.deletion_detected(path);
        }
    }

    fn change_detected(self: &Arc<Self>, snapshot: RepositorySnapshot) {
        if snapshot.has_empty_path() {
            return;
        }

        if !self.aggregator.contains(&snapshot.path) {
            let created = self
                .observers
                .register_with(&snapshot.path, || self.create_observer(&snapshot));
            if created {
                // Only first discoveries re-arm the flush timer; status churn
                // on known repositories never triggers a write.
                self.arm_flush();
            }
        }

        // Contractual ordering: subscribers hear about the change before the
        // new snapshot becomes visible in the aggregator.
        self.emit(MonitorEvent::ChangeDetected(snapshot.clone()));
        self.aggregator.upsert(snapshot);
    }

    fn deletion_detected(self: &Arc<Self>, path: &Path) {
        if path.as_os_str().is_empty() {
            return;
        }

        // Contractual ordering: destroy the observer, notify, then drop the
        // aggregator entry.
        if let Some(observer) = self.observers.remove(path) {
            observer.stop();
        }
        self.emit(MonitorEvent::DeletionDetected(path.to_path_buf()));
        self.aggregator.remove(path);
    }

    /// Create and start the observer for a freshly discovered repository.
    /// Runs under the registry lock via `register_with`.
    fn create_observer(self: &Arc<Self>, snapshot: &RepositorySnapshot) -> Box<dyn RepositoryObserver> {
        tracing::debug!(path = %snapshot.path.display(), "Creating repository observer");

        let weak = Arc::downgrade(self);
        let sink = ObserverSink::new(Arc::new(move |changed: PathBuf| {
            if let Some(inner) = weak.upgrade() {
                // The repository may have disappeared or reappeared since the
                // last signal, so both outcomes are routable.
                inner.check_repository(&changed, RecheckMode::Both);
            }
        }));

        let observer = self
            .observer_factory
            .create(snapshot, self.timings.change_settle, sink);
        observer.start();
        observer
    }

    fn create_detectors(self: &Arc<Self>) -> Vec<Box<dyn RepositoryDetector>> {
        let mut detectors = Vec::new();
        for root in self.paths.roots() {
            if !root.is_dir() {
                // Skipped until the next reset or restart.
                tracing::debug!(root = %root.display(), "Skipping missing root");
                continue;
            }

            let on_change = Arc::downgrade(self);
            let on_delete = Arc::downgrade(self);
            let sink = DetectorSink::new(
                Arc::new(move |snapshot| {
                    if let Some(inner) = on_change.upgrade() {
                        inner.change_detected(snapshot);
                    }
                }),
                Arc::new(move |path: PathBuf| {
                    if let Some(inner) = on_delete.upgrade() {
                        inner.deletion_detected(&path);
                    }
                }),
            );

            detectors.push(
                self.detector_factory
                    .create(&root, self.timings.creation_settle, sink),
            );
        }
        detectors
    }

    fn replay_store(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.runtime.spawn_blocking(move || {
            let known = inner.store.get();
            tracing::debug!(count = known.len(), "Replaying persisted repository paths");
            for path in known {
                inner.check_repository(&path, RecheckMode::FoundOnly);
            }
        });
    }

    fn arm_flush(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.flush.arm(&self.runtime, move || {
            if let Some(inner) = weak.upgrade() {
                inner.persist();
            }
        });
    }

    fn persist(&self) {
        let paths = self.aggregator.paths();
        tracing::debug!(count = paths.len(), "Persisting known repository paths");
        self.store.set(&paths);
    }
}
