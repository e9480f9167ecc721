//! Feasibility thresholds on plant performance.

use serde::{Deserialize, Serialize};

use adhtc_types::{metrics, PerformanceRecord};

/// Optional performance thresholds. A `None` threshold is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_efficiency: Option<f64>,
    /// Upper limit on specific cost, $/kW.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_self_sufficiency: Option<f64>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_efficiency(mut self, value: f64) -> Self {
        self.min_efficiency = Some(value);
        self
    }

    pub fn with_max_cost(mut self, value: f64) -> Self {
        self.max_cost = Some(value);
        self
    }

    pub fn with_min_self_sufficiency(mut self, value: f64) -> Self {
        self.min_self_sufficiency = Some(value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.min_efficiency.is_none()
            && self.max_cost.is_none()
            && self.min_self_sufficiency.is_none()
    }
}

/// Stateless feasibility checks.
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// `true` when every present threshold is met. Checks stop at the first
    /// failure.
    pub fn is_feasible(performance: &PerformanceRecord, constraints: &Constraints) -> bool {
        if let Some(min) = constraints.min_efficiency {
            if performance.overall_efficiency() < min {
                return false;
            }
        }
        if let Some(max) = constraints.max_cost {
            if performance.specific_cost() > max {
                return false;
            }
        }
        if let Some(min) = constraints.min_self_sufficiency {
            if performance.self_sufficiency_ratio() < min {
                return false;
            }
        }
        true
    }

    /// Names of the metrics that break a threshold, in check order.
    pub fn violations(
        performance: &PerformanceRecord,
        constraints: &Constraints,
    ) -> Vec<&'static str> {
        let mut violated = Vec::new();
        if constraints
            .min_efficiency
            .is_some_and(|min| performance.overall_efficiency() < min)
        {
            violated.push(metrics::OVERALL_EFFICIENCY);
        }
        if constraints
            .max_cost
            .is_some_and(|max| performance.specific_cost() > max)
        {
            violated.push(metrics::SPECIFIC_COST);
        }
        if constraints
            .min_self_sufficiency
            .is_some_and(|min| performance.self_sufficiency_ratio() < min)
        {
            violated.push(metrics::SELF_SUFFICIENCY_RATIO);
        }
        violated
    }
}
