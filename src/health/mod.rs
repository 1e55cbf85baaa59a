//! Server health: single probes, retry runs and the background monitor.

pub mod monitor;
pub mod poller;

pub use monitor::HealthMonitor;
pub use poller::{
    HealthCheckResult, HealthPoller, HealthStatus, DEFAULT_RETRY_DELAY, DEFAULT_TRIES,
    HEALTH_ENDPOINT,
};
