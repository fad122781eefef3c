//! SweepActor - periodic alert evaluation
//!
//! Time-based conditions (calendar maintenance) change without any new
//! reading, so every asset is re-evaluated on a fixed interval.
//!
//! ```text
//! Timer tick → AlertService::sweep → transitions published on the event bus
//!     ↑
//!     └─── Commands (SweepNow, Shutdown)
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument, warn};

use crate::alerting::{AlertService, SweepReport};

use super::messages::SweepCommand;

pub struct SweepActor {
    alerts: AlertService,
    command_rx: mpsc::Receiver<SweepCommand>,
    interval_duration: Duration,
}

impl SweepActor {
    pub fn new(
        alerts: AlertService,
        command_rx: mpsc::Receiver<SweepCommand>,
        interval_secs: u64,
    ) -> Self {
        Self {
            alerts,
            command_rx,
            interval_duration: Duration::from_secs(interval_secs.max(1)),
        }
    }

    #[instrument(skip(self), fields(interval = ?self.interval_duration))]
    pub async fn run(mut self) {
        debug!("starting sweep actor");

        let mut ticker = interval(self.interval_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        error!("alert sweep failed: {:#}", e);
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        SweepCommand::SweepNow { respond_to } => {
                            debug!("received SweepNow command");
                            let result = self.sweep().await;
                            let _ = respond_to.send(result);
                        }

                        SweepCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("sweep actor stopped");
    }

    async fn sweep(&self) -> Result<SweepReport> {
        let report = self.alerts.sweep().await?;
        if report.raised + report.resolved > 0 {
            info!(
                "sweep over {} assets: {} raised, {} resolved",
                report.assets_evaluated, report.raised, report.resolved
            );
        }
        if report.failed > 0 {
            warn!("sweep could not evaluate {} assets", report.failed);
        }
        Ok(report)
    }
}

/// Handle for controlling the SweepActor
#[derive(Clone)]
pub struct SweepHandle {
    sender: mpsc::Sender<SweepCommand>,
}

impl SweepHandle {
    pub fn spawn(alerts: AlertService, interval_secs: u64) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let actor = SweepActor::new(alerts, cmd_rx, interval_secs);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Sweep immediately and wait for the report
    pub async fn sweep_now(&self) -> Result<SweepReport> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SweepCommand::SweepNow { respond_to: tx })
            .await
            .context("failed to send SweepNow command")?;

        rx.await.context("failed to receive response")?
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(SweepCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
