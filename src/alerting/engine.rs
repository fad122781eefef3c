//! Pure alert evaluation
//!
//! ## State Machine (per asset and rule)
//!
//! ```text
//! NoAlert --condition met--> Active --still met--> Active (last_seen refreshed)
//!                              |
//!                              +--inside hysteresis band--> Active (unchanged)
//!                              |
//!                              +--past threshold ∓ margin--> Resolved
//! ```
//!
//! Evaluation depends only on the asset (current-value cache and maintenance
//! schedule), the rule set, the asset's active alerts and the observation time.
//! The engine never touches storage; callers persist the returned transitions.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::trace;

use crate::model::{Asset, CurrentValue, MaintenanceInterval, MetricReading};

use super::alert::{Alert, AlertStatus};
use super::rule::{AlertRule, CompareOp, RuleCondition, RuleSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEvaluation {
    /// Condition not met and no alert tracked
    Ok,
    /// Condition met for the first time
    StartsToExceed,
    /// Condition still met while the alert is active
    Exceeding,
    /// Condition no longer met, but the value has not left the hysteresis band
    WithinBand,
    /// Value crossed back past the hysteresis band
    BackToOk,
}

impl AlertEvaluation {
    pub fn evaluate(
        value: f64,
        operator: CompareOp,
        threshold: f64,
        hysteresis: f64,
        active: bool,
    ) -> AlertEvaluation {
        if operator.check(value, threshold) {
            return if active {
                AlertEvaluation::Exceeding
            } else {
                AlertEvaluation::StartsToExceed
            };
        }

        if !active {
            return AlertEvaluation::Ok;
        }

        let cleared = if operator.is_upper_bound() {
            value < threshold - hysteresis
        } else {
            value > threshold + hysteresis
        };

        if cleared {
            AlertEvaluation::BackToOk
        } else {
            AlertEvaluation::WithinBand
        }
    }

    /// Evaluation of a boolean condition without a hysteresis band
    pub fn evaluate_condition(met: bool, active: bool) -> AlertEvaluation {
        match (met, active) {
            (true, false) => AlertEvaluation::StartsToExceed,
            (true, true) => AlertEvaluation::Exceeding,
            (false, true) => AlertEvaluation::BackToOk,
            (false, false) => AlertEvaluation::Ok,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Raised,
    Refreshed,
    Resolved,
}

/// A change to persist: the alert as it must be stored afterwards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertTransition {
    pub kind: TransitionKind,
    pub alert: Alert,
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("asset {asset_id} has {count} active alerts for rule {rule_id}")]
    DuplicateActive {
        asset_id: String,
        rule_id: String,
        count: usize,
    },

    #[error("asset {asset_id} has a non-finite cached value for {metric}")]
    NonFiniteValue { asset_id: String, metric: String },
}

struct Observation {
    met: AlertEvaluation,
    value: f64,
    at: DateTime<Utc>,
    metric: Option<String>,
    message: String,
}

#[derive(Debug, Clone)]
pub struct AlertEngine {
    rules: Arc<RuleSet>,
}

impl AlertEngine {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Re-evaluate the rules bound to `metric` after an ingestion
    pub fn evaluate_metric(
        &self,
        asset: &Asset,
        metric: &str,
        active: &[Alert],
        now: DateTime<Utc>,
    ) -> Result<Vec<AlertTransition>, EvaluationError> {
        self.evaluate_matching(asset, active, now, |rule| rule.is_bound_to(asset, metric))
    }

    /// Re-evaluate the maintenance rules (service recorded)
    pub fn evaluate_maintenance(
        &self,
        asset: &Asset,
        active: &[Alert],
        now: DateTime<Utc>,
    ) -> Result<Vec<AlertTransition>, EvaluationError> {
        self.evaluate_matching(asset, active, now, |rule| {
            rule.applies_to(asset) && matches!(rule.condition, RuleCondition::MaintenanceDue)
        })
    }

    /// Re-evaluate every rule that applies to the asset (periodic sweep)
    pub fn evaluate_all(
        &self,
        asset: &Asset,
        active: &[Alert],
        now: DateTime<Utc>,
    ) -> Result<Vec<AlertTransition>, EvaluationError> {
        self.evaluate_matching(asset, active, now, |rule| rule.applies_to(asset))
    }

    /// Threshold rules on `metric`; their outcome depends on reading order
    pub fn threshold_rules_for<'a>(
        &'a self,
        asset: &'a Asset,
        metric: &'a str,
    ) -> impl Iterator<Item = &'a AlertRule> + 'a {
        self.rules.rules().iter().filter(move |rule| {
            matches!(rule.condition, RuleCondition::Threshold { .. })
                && rule.is_bound_to(asset, metric)
        })
    }

    /// Run a threshold rule over `readings` (timestamp order), starting from
    /// `open` if an alert was active before the first of them.
    ///
    /// Returns every alert of the run, oldest first. Only the last one can be
    /// active.
    pub fn replay_rule(
        &self,
        rule: &AlertRule,
        asset: &Asset,
        open: Option<Alert>,
        readings: &[MetricReading],
    ) -> Result<Vec<Alert>, EvaluationError> {
        let RuleCondition::Threshold { metric, .. } = &rule.condition else {
            return Ok(Vec::new());
        };

        let mut scratch = asset.clone();
        let mut alerts: Vec<Alert> = open.into_iter().collect();

        for reading in readings.iter().filter(|r| r.metric == *metric) {
            scratch.current.insert(
                metric.clone(),
                CurrentValue {
                    value: reading.value,
                    timestamp: reading.timestamp,
                },
            );

            let existing = alerts.last().filter(|alert| alert.is_active());
            let Some(transition) = Self::evaluate_rule(rule, &scratch, existing, reading.timestamp)?
            else {
                continue;
            };

            if transition.kind == TransitionKind::Raised {
                alerts.push(transition.alert);
            } else if let Some(last) = alerts.last_mut() {
                *last = transition.alert;
            }
        }

        Ok(alerts)
    }

    fn evaluate_matching(
        &self,
        asset: &Asset,
        active: &[Alert],
        now: DateTime<Utc>,
        filter: impl Fn(&AlertRule) -> bool,
    ) -> Result<Vec<AlertTransition>, EvaluationError> {
        let mut transitions = Vec::new();

        for rule in self.rules.rules().iter().filter(|rule| filter(rule)) {
            let mut existing = active
                .iter()
                .filter(|a| a.is_active() && a.rule_id == rule.id && a.asset_id == asset.id);
            let current = existing.next();
            let extra = existing.count();
            if extra > 0 {
                return Err(EvaluationError::DuplicateActive {
                    asset_id: asset.id.clone(),
                    rule_id: rule.id.clone(),
                    count: extra + 1,
                });
            }

            if let Some(transition) = Self::evaluate_rule(rule, asset, current, now)? {
                transitions.push(transition);
            }
        }

        Ok(transitions)
    }

    fn evaluate_rule(
        rule: &AlertRule,
        asset: &Asset,
        existing: Option<&Alert>,
        now: DateTime<Utc>,
    ) -> Result<Option<AlertTransition>, EvaluationError> {
        let active = existing.is_some();

        let observation = match &rule.condition {
            RuleCondition::Threshold {
                metric,
                operator,
                threshold,
                hysteresis,
            } => {
                let Some(current) = asset.current_value(metric) else {
                    return Ok(None);
                };
                if !current.value.is_finite() {
                    return Err(EvaluationError::NonFiniteValue {
                        asset_id: asset.id.clone(),
                        metric: metric.clone(),
                    });
                }

                Observation {
                    met: AlertEvaluation::evaluate(
                        current.value,
                        *operator,
                        *threshold,
                        *hysteresis,
                        active,
                    ),
                    value: current.value,
                    at: current.timestamp,
                    metric: Some(metric.clone()),
                    message: format!(
                        "{}: {metric} is {:.1} ({operator} {threshold})",
                        rule.display_name(),
                        current.value
                    ),
                }
            }
            RuleCondition::MaintenanceDue => maintenance_observation(rule, asset, active, now),
        };

        trace!(
            "{}: rule {} -> {:?} (value {})",
            asset.id, rule.id, observation.met, observation.value
        );

        let transition = match (observation.met, existing) {
            (AlertEvaluation::StartsToExceed, _) => Some(AlertTransition {
                kind: TransitionKind::Raised,
                alert: Alert::raise(
                    &rule.id,
                    &asset.id,
                    observation.metric.as_deref(),
                    rule.severity,
                    observation.message,
                    observation.value,
                    observation.at,
                ),
            }),
            (AlertEvaluation::Exceeding, Some(alert)) if observation.at > alert.last_seen => {
                let mut alert = alert.clone();
                alert.last_seen = observation.at;
                Some(AlertTransition {
                    kind: TransitionKind::Refreshed,
                    alert,
                })
            }
            (AlertEvaluation::BackToOk, Some(alert)) => {
                let mut alert = alert.clone();
                alert.status = AlertStatus::Resolved;
                alert.resolved_at = Some(observation.at.max(alert.last_seen));
                Some(AlertTransition {
                    kind: TransitionKind::Resolved,
                    alert,
                })
            }
            _ => None,
        };

        Ok(transition)
    }
}

fn maintenance_observation(
    rule: &AlertRule,
    asset: &Asset,
    active: bool,
    now: DateTime<Utc>,
) -> Observation {
    let not_due = |at| Observation {
        met: AlertEvaluation::evaluate_condition(false, active),
        value: 0.0,
        at,
        metric: None,
        message: String::new(),
    };

    let Some(schedule) = &asset.maintenance else {
        return not_due(now);
    };

    match &schedule.interval {
        MaintenanceInterval::OperatingHours { hours, metric } => {
            // readings taken before the last service belong to the previous interval
            let fresh = asset.current_value(metric).filter(|current| {
                schedule
                    .last_serviced
                    .is_none_or(|serviced| current.timestamp >= serviced)
            });

            let Some(current) = fresh else {
                return not_due(now);
            };

            Observation {
                met: AlertEvaluation::evaluate_condition(current.value >= *hours, active),
                value: current.value,
                at: current.timestamp,
                metric: Some(metric.clone()),
                message: format!(
                    "{}: {metric} ({:.0}h) reached the maintenance interval of {hours}h",
                    rule.display_name(),
                    current.value
                ),
            }
        }
        MaintenanceInterval::Calendar { days } => {
            let since = schedule.last_serviced.unwrap_or(asset.created_at);
            let elapsed = now - since;
            let elapsed_days = elapsed.num_hours() as f64 / 24.0;

            Observation {
                met: AlertEvaluation::evaluate_condition(
                    elapsed >= Duration::days(i64::from(*days)),
                    active,
                ),
                value: elapsed_days,
                at: now,
                metric: None,
                message: format!(
                    "{}: {elapsed_days:.0} days since last service (interval {days} days)",
                    rule.display_name()
                ),
            }
        }
    }
}
