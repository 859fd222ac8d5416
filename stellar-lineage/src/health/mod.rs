//! Stage health and fleet-wide backpressure.
//!
//! Every stage asks [`HealthMonitor::is_healthy`] before claiming work. When
//! an upstream keeps failing, the retry hook returned by
//! [`HealthMonitor::retry_hook`] marks the whole fleet unhealthy so every
//! stage sharing that upstream stops. [`HealthCheckStage`] lifts the mark
//! once the recovery buffer has elapsed.

mod check;
mod monitor;
mod store;

pub use check::HealthCheckStage;
pub use monitor::{HealthMonitor, HealthRetryHook};
pub use store::{CronHealthStore, InMemoryCronHealthStore};

/// Shared health row consulted by every stage.
pub const FLEET_CRON: &str = "fleet";

/// Name of the recovery stage; never marked unhealthy.
pub const HEALTH_CHECK_CRON: &str = "cron_health_check";
