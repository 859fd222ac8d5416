//! Periodic scheduling of every stage driver.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::{StageDriver, StageOutcome};
use crate::context::StageContext;
use crate::errors::Result;
use crate::health::HealthCheckStage;
use crate::stages::{all_stages, LineageStage};

/// Result of one driver within a tick.
#[derive(Debug)]
pub struct StageReport {
    /// Stage cron name.
    pub stage: &'static str,
    /// What the driver did, or why it failed.
    pub result: Result<StageOutcome>,
}

/// Result of one fleet tick.
#[derive(Debug)]
pub struct TickReport {
    /// Crons reset by the health check, or its error.
    pub recovered: Result<Vec<String>>,
    /// One entry per driver, in pipeline order.
    pub stages: Vec<StageReport>,
}

impl TickReport {
    /// Number of records advanced during the tick.
    #[must_use]
    pub fn advanced(&self) -> usize {
        self.stages
            .iter()
            .filter(|r| matches!(&r.result, Ok(outcome) if outcome.is_advanced()))
            .count()
    }

    /// Number of drivers that returned an error.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.stages.iter().filter(|r| r.result.is_err()).count()
    }
}

/// Every stage driver plus the health check, ticked together.
pub struct Fleet {
    drivers: Vec<StageDriver>,
    health_check: HealthCheckStage,
}

impl fmt::Debug for Fleet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fleet")
            .field("drivers", &self.drivers)
            .field("health_check", &self.health_check)
            .finish()
    }
}

impl Fleet {
    /// Creates a fleet over the given stages.
    #[must_use]
    pub fn new(ctx: &StageContext, stages: Vec<Arc<dyn LineageStage>>) -> Self {
        let health_check =
            HealthCheckStage::new(ctx.health().clone(), ctx.config().recovery_buffer());
        let drivers = stages
            .into_iter()
            .map(|stage| StageDriver::new(stage, ctx.clone()))
            .collect();
        Self {
            drivers,
            health_check,
        }
    }

    /// Creates a fleet running every stage.
    #[must_use]
    pub fn standard(ctx: &StageContext) -> Self {
        Self::new(ctx, all_stages())
    }

    /// The drivers in pipeline order.
    #[must_use]
    pub fn drivers(&self) -> &[StageDriver] {
        &self.drivers
    }

    /// Runs the health check, then every driver once.
    ///
    /// Drivers run downstream first, so a record advances at most one step
    /// per tick.
    pub async fn tick(&self) -> TickReport {
        let recovered = self.health_check.run_once().await;
        if let Err(err) = &recovered {
            tracing::error!(error = %err, "Health check failed");
        }

        let mut stages = Vec::with_capacity(self.drivers.len());
        for driver in self.drivers.iter().rev() {
            let result = driver.run_once().await;
            if let Err(err) = &result {
                tracing::warn!(stage = driver.name(), error = %err, "Stage run failed");
            }
            stages.push(StageReport {
                stage: driver.name(),
                result,
            });
        }
        stages.reverse();

        TickReport { recovered, stages }
    }

    /// Ticks every `interval` until `shutdown` becomes true or its sender
    /// is dropped. Returns the number of ticks run.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) -> usize {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0;

        tracing::info!(drivers = self.drivers.len(), ?interval, "Fleet started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    ticks += 1;
                    tracing::debug!(
                        tick = ticks,
                        advanced = report.advanced(),
                        failed = report.failed(),
                        "Fleet tick complete"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!(ticks, "Fleet stopped");
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LineageStatus, RATE_LIMITED_BY_EXTERNAL_API_SERVER};
    use crate::testing::{fixtures, TestHarness};

    const GA: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    #[tokio::test]
    async fn test_tick_advances_each_record_one_step() {
        let harness = TestHarness::new();
        harness
            .horizon
            .insert_account(GA, fixtures::account_json(GA, None, "1.0"));
        harness.add_pending(GA).await.unwrap();
        let fleet = Fleet::standard(&harness.ctx);

        let report = fleet.tick().await;

        assert_eq!(report.stages.len(), 8);
        assert_eq!(report.advanced(), 1);
        assert_eq!(report.failed(), 0);
        assert_eq!(
            harness.record(GA).await.unwrap().status,
            LineageStatus::DoneCollectingAccounts
        );
    }

    #[tokio::test]
    async fn test_tick_recovers_after_buffer() {
        let harness = TestHarness::new();
        let fleet = Fleet::standard(&harness.ctx);
        harness
            .ctx
            .health()
            .mark_fleet_unhealthy("collect_horizon_accounts", RATE_LIMITED_BY_EXTERNAL_API_SERVER, "test")
            .await
            .unwrap();

        let report = fleet.tick().await;
        assert!(report.recovered.unwrap().is_empty());
        assert!(report
            .stages
            .iter()
            .all(|r| matches!(r.result, Ok(StageOutcome::Unhealthy))));

        harness.clock.advance(chrono::Duration::hours(2));
        let report = fleet.tick().await;
        assert!(!report.recovered.unwrap().is_empty());
        assert!(report
            .stages
            .iter()
            .all(|r| matches!(r.result, Ok(StageOutcome::Idle))));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let harness = TestHarness::new();
        let fleet = Fleet::standard(&harness.ctx);
        let (tx, rx) = watch::channel(false);

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send(true).ok();
        });
        let ticks = fleet.run(Duration::from_millis(10), rx).await;
        stopper.await.unwrap();

        assert!(ticks >= 1);
    }
}
