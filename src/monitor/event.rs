//! Events produced by the monitor and re-check routing modes.

use std::path::PathBuf;

use crate::repository::RepositorySnapshot;

/// Notification emitted by the monitor to its subscribers.
///
/// Events are sent synchronously on the triggering thread; subscribers
/// receive them over a broadcast channel and must not block the monitor.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A repository was discovered or changed. Emitted before the snapshot
    /// becomes visible in the aggregator.
    ChangeDetected(RepositorySnapshot),
    /// A known repository disappeared. Emitted after its observer is
    /// destroyed and before the aggregator entry is removed.
    DeletionDetected(PathBuf),
    /// The scanning flag flipped.
    ScanStateChanged(bool),
}

/// Which resolution outcomes a re-check is allowed to report.
///
/// Startup replay of the persisted store uses [`FoundOnly`](Self::FoundOnly)
/// so stale entries are silently dropped rather than reported as deletions.
/// Observer-triggered re-checks use [`Both`](Self::Both) because the
/// underlying repository may have disappeared or reappeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecheckMode {
    FoundOnly,
    NotFoundOnly,
    Both,
}

impl RecheckMode {
    /// Whether a found resolution may be routed to change handling.
    #[must_use]
    pub fn permits_found(self) -> bool {
        matches!(self, Self::FoundOnly | Self::Both)
    }

    /// Whether a not-found resolution may be routed to deletion handling.
    #[must_use]
    pub fn permits_not_found(self) -> bool {
        matches!(self, Self::NotFoundOnly | Self::Both)
    }
}
