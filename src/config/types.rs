//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitor::MonitorTimings;

/// Monitor configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Root directories to scan and watch, in order.
    pub roots: Vec<PathBuf>,
    /// Quiet period in milliseconds after a first discovery before
    /// persistence flushes; also the settle delay for root detectors.
    pub creation_settle_ms: u64,
    /// Settle delay in milliseconds for per-repository observers.
    pub change_settle_ms: u64,
    /// Store file location. Falls back to the user data directory.
    pub store_path: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            creation_settle_ms: 5000,
            change_settle_ms: 500,
            store_path: None,
        }
    }
}

impl MonitorConfig {
    /// The configured settle delays as monitor timings.
    #[must_use]
    pub fn timings(&self) -> MonitorTimings {
        MonitorTimings {
            creation_settle: Duration::from_millis(self.creation_settle_ms),
            change_settle: Duration::from_millis(self.change_settle_ms),
        }
    }
}
