//! Alert rule configuration
//!
//! Rules are loaded once at start-up and wrapped in a [`RuleSet`], which is
//! immutable for the lifetime of the process.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AasError, AasResult};
use crate::model::{Asset, validate_identifier};

/// Alert severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Info,
    #[serde(alias = "medium")]
    Warning,
    MaintenanceDue,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::MaintenanceDue => "maintenance-due",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = AasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" | "medium" => Ok(Severity::Warning),
            "maintenance-due" => Ok(Severity::MaintenanceDue),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(AasError::validation(format!("unknown severity: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">", alias = "gt", alias = "greater_than")]
    GreaterThan,
    #[serde(rename = ">=", alias = "gte", alias = "greater_equal")]
    GreaterEqual,
    #[serde(rename = "<", alias = "lt", alias = "less_than")]
    LessThan,
    #[serde(rename = "<=", alias = "lte", alias = "less_equal")]
    LessEqual,
}

impl CompareOp {
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            CompareOp::GreaterThan => value > threshold,
            CompareOp::GreaterEqual => value >= threshold,
            CompareOp::LessThan => value < threshold,
            CompareOp::LessEqual => value <= threshold,
        }
    }

    /// Whether the alert fires on high values
    pub fn is_upper_bound(&self) -> bool {
        matches!(self, CompareOp::GreaterThan | CompareOp::GreaterEqual)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::GreaterThan => ">",
            CompareOp::GreaterEqual => ">=",
            CompareOp::LessThan => "<",
            CompareOp::LessEqual => "<=",
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCondition {
    /// `value <operator> threshold`, cleared once past `threshold ∓ hysteresis`
    Threshold {
        metric: String,
        operator: CompareOp,
        threshold: f64,
        #[serde(default)]
        hysteresis: f64,
    },

    /// Elapsed service interval reached the asset's maintenance schedule
    MaintenanceDue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub severity: Severity,

    /// Only evaluate for assets of this kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_kind: Option<String>,

    #[serde(flatten)]
    pub condition: RuleCondition,
}

impl AlertRule {
    pub fn threshold(
        id: impl Into<String>,
        metric: impl Into<String>,
        operator: CompareOp,
        threshold: f64,
        hysteresis: f64,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            severity,
            asset_kind: None,
            condition: RuleCondition::Threshold {
                metric: metric.into(),
                operator,
                threshold,
                hysteresis,
            },
        }
    }

    pub fn maintenance_due(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            severity: Severity::MaintenanceDue,
            asset_kind: None,
            condition: RuleCondition::MaintenanceDue,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn for_kind(mut self, kind: impl Into<String>) -> Self {
        self.asset_kind = Some(kind.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn applies_to(&self, asset: &Asset) -> bool {
        self.asset_kind.as_ref().is_none_or(|kind| *kind == asset.kind)
    }

    /// Whether ingesting `metric` for `asset` may change this rule's outcome
    pub fn is_bound_to(&self, asset: &Asset, metric: &str) -> bool {
        if !self.applies_to(asset) {
            return false;
        }
        match &self.condition {
            RuleCondition::Threshold { metric: m, .. } => m == metric,
            RuleCondition::MaintenanceDue => asset
                .maintenance
                .as_ref()
                .and_then(|schedule| schedule.metric())
                .is_some_and(|m| m == metric),
        }
    }

    fn validate(&self) -> AasResult<()> {
        validate_identifier("rule id", &self.id)?;
        if let RuleCondition::Threshold {
            metric,
            threshold,
            hysteresis,
            ..
        } = &self.condition
        {
            validate_identifier("rule metric", metric)?;
            if !threshold.is_finite() {
                return Err(AasError::validation(format!(
                    "rule {} has a non-finite threshold",
                    self.id
                )));
            }
            if !hysteresis.is_finite() || *hysteresis < 0.0 {
                return Err(AasError::validation(format!(
                    "rule {} needs a non-negative hysteresis margin",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Validated, immutable set of alert rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<AlertRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<AlertRule>) -> AasResult<Self> {
        let mut ids = HashSet::new();
        for rule in &rules {
            rule.validate()?;
            if !ids.insert(rule.id.as_str()) {
                return Err(AasError::validation(format!(
                    "duplicate alert rule id {}",
                    rule.id
                )));
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&AlertRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
