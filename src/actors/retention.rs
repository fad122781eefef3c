//! RetentionActor - prunes reading history and resolved alerts
//!
//! Runs once at startup and then every `interval_hours`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::storage::{RetentionOutcome, RetentionPolicy, RetryPolicy, StorageBackend, with_retry};

use super::messages::RetentionCommand;

pub struct RetentionActor {
    backend: Arc<dyn StorageBackend>,
    policy: RetentionPolicy,
    retry: RetryPolicy,
    command_rx: mpsc::Receiver<RetentionCommand>,
    interval_duration: Duration,
}

impl RetentionActor {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        policy: RetentionPolicy,
        retry: RetryPolicy,
        command_rx: mpsc::Receiver<RetentionCommand>,
        interval_hours: u32,
    ) -> Self {
        Self {
            backend,
            policy,
            retry,
            command_rx,
            interval_duration: Duration::from_secs(u64::from(interval_hours.max(1)) * 3600),
        }
    }

    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting retention actor with {:?}", self.policy);

        // the first tick completes immediately, which covers the startup run
        let mut cleanup_interval = time::interval(self.interval_duration);
        cleanup_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cleanup_interval.tick() => {
                    if let Err(e) = self.run_cleanup().await {
                        error!("retention cleanup failed: {:#}", e);
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        RetentionCommand::RunNow { respond_to } => {
                            debug!("received RunNow command");
                            let _ = respond_to.send(self.run_cleanup().await);
                        }

                        RetentionCommand::Shutdown => {
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

        debug!("retention actor stopped");
    }

    async fn run_cleanup(&self) -> Result<RetentionOutcome> {
        let now = Utc::now();
        let outcome = with_retry(&self.retry, "apply_retention", || {
            self.backend.apply_retention(&self.policy, now)
        })
        .await?;

        if outcome.readings_deleted + outcome.alerts_deleted > 0 {
            info!(
                "retention removed {} readings and {} resolved alerts",
                outcome.readings_deleted, outcome.alerts_deleted
            );
        } else {
            debug!("retention found nothing to remove");
        }
        Ok(outcome)
    }
}

/// Handle for controlling the RetentionActor
#[derive(Clone)]
pub struct RetentionHandle {
    sender: mpsc::Sender<RetentionCommand>,
}

impl RetentionHandle {
    pub fn spawn(
        backend: Arc<dyn StorageBackend>,
        policy: RetentionPolicy,
        retry: RetryPolicy,
        interval_hours: u32,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let actor = RetentionActor::new(backend, policy, retry, cmd_rx, interval_hours);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    pub async fn run_now(&self) -> Result<RetentionOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RetentionCommand::RunNow { respond_to: tx })
            .await
            .context("failed to send RunNow command")?;

        rx.await.context("failed to receive response")?
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(RetentionCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
