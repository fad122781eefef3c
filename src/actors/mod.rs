//! Background actors of the hub
//!
//! Each actor runs as an independent tokio task, owns an mpsc command channel
//! and is driven by a handle that can be cloned and shared.
//!
//! - **SweepActor**: periodically re-evaluates every rule for every asset
//! - **RetentionActor**: prunes old readings and resolved alerts
//! - **NotifierActor**: forwards raised and resolved alerts to a webhook

pub mod messages;
pub mod notifier;
pub mod retention;
pub mod sweep;

pub use messages::{NotifierCommand, NotifierStats, RetentionCommand, SweepCommand};
pub use notifier::NotifierHandle;
pub use retention::RetentionHandle;
pub use sweep::SweepHandle;
