//! Fetch activity gating.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::ports::FetchToggle;

/// Shared on/off flag gating an independent background fetch activity.
///
/// The monitor flips it on in `observe()` and off in `stop()`; whatever runs
/// the fetch loop polls [`is_active`](Self::is_active) and does nothing else
/// with the monitor's state.
#[derive(Debug, Default)]
pub struct FetchActivityFlag {
    active: AtomicBool,
}

impl FetchActivityFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether fetching is currently allowed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl FetchToggle for FetchActivityFlag {
    fn set_active(&self, active: bool) {
        tracing::debug!(active, "Fetch activity toggled");
        self.active.store(active, Ordering::SeqCst);
    }
}
