//! Periodic recovery of unhealthy crons.

use chrono::Duration;

use super::{HealthMonitor, HEALTH_CHECK_CRON};
use crate::errors::Result;

/// Resets crons whose unhealthy mark is older than the recovery buffer.
#[derive(Debug, Clone)]
pub struct HealthCheckStage {
    monitor: HealthMonitor,
    recovery_buffer: Duration,
}

impl HealthCheckStage {
    /// Creates the stage.
    #[must_use]
    pub const fn new(monitor: HealthMonitor, recovery_buffer: Duration) -> Self {
        Self {
            monitor,
            recovery_buffer,
        }
    }

    /// Stage name used in health rows and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        HEALTH_CHECK_CRON
    }

    /// Runs one pass and returns the names of the recovered crons.
    pub async fn run_once(&self) -> Result<Vec<String>> {
        let now = self.monitor.clock().now();
        let mut recovered = Vec::new();

        for row in self.monitor.overview().await? {
            if row.status.is_healthy() || now - row.created_at < self.recovery_buffer {
                continue;
            }
            tracing::info!(
                cron = %row.cron_name,
                unhealthy_since = %row.created_at,
                "Recovering cron after buffer elapsed"
            );
            self.monitor
                .mark_healthy(&row.cron_name, "recovery buffer elapsed")
                .await?;
            recovered.push(row.cron_name);
        }

        Ok(recovered)
    }
}
