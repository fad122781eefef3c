//! Commands for the background actors
//!
//! Each actor owns an mpsc command channel. Requests that need an answer carry
//! a oneshot sender; everything else is fire-and-forget.

use tokio::sync::oneshot;

use crate::alerting::SweepReport;
use crate::storage::RetentionOutcome;

/// Commands that can be sent to the SweepActor
#[derive(Debug)]
pub enum SweepCommand {
    /// Run a sweep immediately (bypassing the interval timer)
    SweepNow {
        respond_to: oneshot::Sender<anyhow::Result<SweepReport>>,
    },

    /// Gracefully shut down the sweep actor
    Shutdown,
}

/// Commands that can be sent to the RetentionActor
#[derive(Debug)]
pub enum RetentionCommand {
    /// Apply the retention policy now
    RunNow {
        respond_to: oneshot::Sender<anyhow::Result<RetentionOutcome>>,
    },

    Shutdown,
}

/// Commands that can be sent to the NotifierActor
#[derive(Debug)]
pub enum NotifierCommand {
    /// Number of notifications delivered so far
    GetStats {
        respond_to: oneshot::Sender<NotifierStats>,
    },

    Shutdown,
}

/// Delivery statistics of the webhook notifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifierStats {
    pub delivered: u64,
    pub failed: u64,

    /// Events dropped because the notifier fell behind the event bus
    pub lagged: u64,
}
