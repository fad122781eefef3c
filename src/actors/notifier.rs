//! NotifierActor - forwards alert events to a webhook
//!
//! Subscribes to the event bus and POSTs a JSON notification for every raised
//! or resolved alert at or above the configured severity. Delivery failures
//! are logged and counted, never retried; the stored alert stays authoritative.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, instrument, trace, warn};

use crate::alerting::{Alert, Severity};
use crate::config::Webhook;
use crate::events::{AasEvent, EventBus};

use super::messages::{NotifierCommand, NotifierStats};

/// Body of a webhook request
#[derive(Debug, Clone, Serialize)]
pub struct AlertNotification {
    /// `alert_raised` or `alert_resolved`
    pub event: &'static str,

    /// Human readable one-liner
    pub text: String,

    pub alert: Alert,
}

impl AlertNotification {
    pub fn from_event(event: &AasEvent) -> Option<Self> {
        let (kind, alert) = match event {
            AasEvent::AlertRaised { alert } => ("alert_raised", alert),
            AasEvent::AlertResolved { alert } => ("alert_resolved", alert),
            _ => return None,
        };

        let text = match kind {
            "alert_raised" => format!(
                "[{}] {}: {}",
                alert.severity.to_string().to_uppercase(),
                alert.asset_id,
                alert.message
            ),
            _ => format!("[RESOLVED] {}: {}", alert.asset_id, alert.message),
        };

        Some(Self {
            event: kind,
            text,
            alert: alert.clone(),
        })
    }
}

pub struct NotifierActor {
    webhook: Webhook,
    client: Client,
    event_rx: broadcast::Receiver<AasEvent>,
    command_rx: mpsc::Receiver<NotifierCommand>,
    stats: NotifierStats,
}

impl NotifierActor {
    pub fn new(
        webhook: Webhook,
        event_rx: broadcast::Receiver<AasEvent>,
        command_rx: mpsc::Receiver<NotifierCommand>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            webhook,
            client,
            event_rx,
            command_rx,
            stats: NotifierStats::default(),
        }
    }

    fn wants(&self, severity: Severity) -> bool {
        self.webhook.min_severity.is_none_or(|min| severity >= min)
    }

    #[instrument(skip(self), fields(url = %self.webhook.url))]
    pub async fn run(mut self) {
        debug!("starting notifier actor");

        loop {
            tokio::select! {
                result = self.event_rx.recv() => {
                    match result {
                        Ok(event) => self.handle_event(&event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("notifier lagged, skipped {skipped} events");
                            self.stats.lagged += skipped;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("event channel closed, shutting down");
                            break;
                        }
                    }
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        NotifierCommand::GetStats { respond_to } => {
                            let _ = respond_to.send(self.stats);
                        }

                        NotifierCommand::Shutdown => {
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

        debug!("notifier actor stopped");
    }

    async fn handle_event(&mut self, event: &AasEvent) {
        let Some(notification) = AlertNotification::from_event(event) else {
            return;
        };
        if !self.wants(notification.alert.severity) {
            trace!("{} below notification severity", notification.alert.id);
            return;
        }

        match self.send(&notification).await {
            Ok(()) => {
                debug!("delivered {} for {}", notification.event, notification.alert.id);
                self.stats.delivered += 1;
            }
            Err(e) => {
                error!("failed to deliver {}: {:#}", notification.event, e);
                self.stats.failed += 1;
            }
        }
    }

    async fn send(&self, notification: &AlertNotification) -> Result<()> {
        self.client
            .post(&self.webhook.url)
            .json(notification)
            .send()
            .await
            .context("webhook request failed")?
            .error_for_status()
            .context("webhook rejected notification")?;
        Ok(())
    }
}

/// Handle for controlling the NotifierActor
#[derive(Clone)]
pub struct NotifierHandle {
    sender: mpsc::Sender<NotifierCommand>,
}

impl NotifierHandle {
    /// Subscribe to the bus and start delivering
    pub fn spawn(webhook: Webhook, events: &EventBus) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let actor = NotifierActor::new(webhook, events.subscribe(), cmd_rx);

        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    pub async fn stats(&self) -> Result<NotifierStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(NotifierCommand::GetStats { respond_to: tx })
            .await
            .context("failed to send GetStats command")?;

        rx.await.context("failed to receive response")
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(NotifierCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
