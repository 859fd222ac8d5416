//! Event sinks for pipeline observability.
//!
//! Stage drivers and the health monitor report what they did to an injected
//! [`EventSink`]. Events complement the `tracing` output and the `Result`
//! returned to the caller; they never replace either.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A stage moved a record to its in-progress status.
pub const STAGE_CLAIMED: &str = "stage.claimed";
/// A stage wrote its done status.
pub const STAGE_ADVANCED: &str = "stage.advanced";
/// A stage failed after claiming; the record stays in progress.
pub const STAGE_FAILED: &str = "stage.failed";
/// A stage did not run (unhealthy, busy or nothing eligible).
pub const STAGE_SKIPPED: &str = "stage.skipped";
/// A cron was marked unhealthy.
pub const HEALTH_UNHEALTHY: &str = "health.unhealthy";
/// A cron was reset to healthy by the health check.
pub const HEALTH_RECOVERED: &str = "health.recovered";
