//! The orchestration engine: aggregator, observer registry, flush
//! scheduling, and the monitor itself.

mod aggregator;
mod engine;
mod event;
mod flush;
mod registry;

pub use aggregator::RepositoryAggregator;
pub use engine::{
    MonitorTimings, RepositoryMonitor, DEFAULT_CHANGE_SETTLE, DEFAULT_CREATION_SETTLE,
};
pub use event::{MonitorEvent, RecheckMode};
pub use flush::FlushScheduler;
pub use registry::ObserverRegistry;
