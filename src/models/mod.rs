pub mod monitor;
pub mod snapshot;

pub use monitor::{
    normalize_interval, CreateMonitorRequest, CreatedMonitor, Monitor, MonitorState, MonitorView,
    DEFAULT_INTERVAL_MS,
};
pub use snapshot::{ProcessEntry, ProcessUsage, Snapshot};
