pub mod investigation_monitor;

pub use investigation_monitor::{InvestigationMonitor, create_monitor_channel, run_monitor};
