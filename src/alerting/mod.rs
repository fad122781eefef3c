//! Threshold and maintenance alerting
//!
//! - [`rule`]: immutable rule configuration
//! - [`engine`]: pure evaluation producing [`AlertTransition`]s
//! - [`service`]: persists transitions, acknowledgement and the periodic sweep

pub mod alert;
pub mod engine;
pub mod rule;
pub mod service;

pub use alert::{Alert, AlertQuery, AlertStatus};
pub use engine::{AlertEngine, AlertEvaluation, AlertTransition, EvaluationError, TransitionKind};
pub use rule::{AlertRule, CompareOp, RuleCondition, RuleSet, Severity};
pub use service::{AlertService, SweepReport};
