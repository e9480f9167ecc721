//! Weighted multi-objective fitness.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

use adhtc_types::{AdhtcResult, PerformanceRecord};

use crate::model::PerformanceModel;
use crate::space::ParameterAssignment;

/// What the optimizer should push up and what it should push down.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Objectives {
    pub maximize: Vec<String>,
    pub minimize: Vec<String>,
    /// Per-objective weight; objectives without an entry weigh 1.0.
    pub weights: HashMap<String, f64>,
}

impl Objectives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn maximize(mut self, name: impl Into<String>) -> Self {
        self.maximize.push(name.into());
        self
    }

    pub fn minimize(mut self, name: impl Into<String>) -> Self {
        self.minimize.push(name.into());
        self
    }

    pub fn with_weight(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(name.into(), weight);
        self
    }

    pub fn weight(&self, name: &str) -> f64 {
        self.weights.get(name).copied().unwrap_or(1.0)
    }

    pub fn is_empty(&self) -> bool {
        self.maximize.is_empty() && self.minimize.is_empty()
    }
}

/// Reference values used to bring power and cost onto a unit scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Normalization {
    pub reference_power_kw: f64,
    /// $/kW
    pub reference_cost: f64,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            reference_power_kw: 100_000.0,
            reference_cost: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Term {
    Efficiency,
    Power,
    SelfSufficiency,
    Cost,
}

impl Term {
    fn maximized(name: &str) -> Option<Self> {
        match name {
            "efficiency" | "overall_efficiency" => Some(Self::Efficiency),
            "power_output" | "net_power_kw" => Some(Self::Power),
            "self_sufficiency" | "self_sufficiency_ratio" => Some(Self::SelfSufficiency),
            _ => None,
        }
    }

    fn minimized(name: &str) -> Option<Self> {
        match name {
            "specific_cost" | "cost" => Some(Self::Cost),
            _ => None,
        }
    }

    fn contribution(self, perf: &PerformanceRecord, norm: &Normalization) -> f64 {
        match self {
            Self::Efficiency => perf.overall_efficiency(),
            Self::Power => perf.net_power_kw() / norm.reference_power_kw,
            Self::SelfSufficiency => perf.self_sufficiency_ratio(),
            // Minimization folded into maximization by inverting around 1.0.
            Self::Cost => 1.0 - perf.specific_cost() / norm.reference_cost,
        }
    }
}

/// Scores parameter assignments against a set of [`Objectives`].
///
/// Objective names are resolved once on construction. Unknown names are
/// skipped with a warning rather than rejected.
pub struct FitnessEvaluator<'m> {
    model: &'m dyn PerformanceModel,
    terms: Vec<(Term, f64)>,
    normalization: Normalization,
    evaluations: AtomicUsize,
}

impl<'m> FitnessEvaluator<'m> {
    pub fn new(model: &'m dyn PerformanceModel, objectives: &Objectives) -> Self {
        Self::with_normalization(model, objectives, Normalization::default())
    }

    pub fn with_normalization(
        model: &'m dyn PerformanceModel,
        objectives: &Objectives,
        normalization: Normalization,
    ) -> Self {
        let mut terms = Vec::new();
        for name in &objectives.maximize {
            match Term::maximized(name) {
                Some(term) => terms.push((term, objectives.weight(name))),
                None => warn!("Ignoring unknown maximize objective '{}'", name),
            }
        }
        for name in &objectives.minimize {
            match Term::minimized(name) {
                Some(term) => terms.push((term, objectives.weight(name))),
                None => warn!("Ignoring unknown minimize objective '{}'", name),
            }
        }

        Self {
            model,
            terms,
            normalization,
            evaluations: AtomicUsize::new(0),
        }
    }

    /// Run the model and score the result.
    pub fn evaluate(&self, params: &ParameterAssignment) -> AdhtcResult<f64> {
        self.evaluate_with_performance(params)
            .map(|(fitness, _)| fitness)
    }

    pub fn evaluate_with_performance(
        &self,
        params: &ParameterAssignment,
    ) -> AdhtcResult<(f64, PerformanceRecord)> {
        let performance = self.performance(params)?;
        Ok((self.score(&performance), performance))
    }

    /// Run the model only.
    pub fn performance(&self, params: &ParameterAssignment) -> AdhtcResult<PerformanceRecord> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        self.model.evaluate(params)
    }

    /// Fitness of an already computed performance record.
    pub fn score(&self, performance: &PerformanceRecord) -> f64 {
        self.terms
            .iter()
            .map(|(term, weight)| weight * term.contribution(performance, &self.normalization))
            .sum()
    }

    /// Number of model calls made through this evaluator.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::ParameterSpace;
    use adhtc_types::metrics;

    fn fixed_model(_: &ParameterAssignment) -> AdhtcResult<PerformanceRecord> {
        Ok(PerformanceRecord::new()
            .with(metrics::OVERALL_EFFICIENCY, 0.4)
            .with(metrics::NET_POWER_KW, 50_000.0)
            .with(metrics::SPECIFIC_COST, 800.0)
            .with(metrics::SELF_SUFFICIENCY_RATIO, 0.5))
    }

    fn params() -> ParameterAssignment {
        ParameterSpace::builder()
            .add("x", 0.0, 1.0)
            .build()
            .unwrap()
            .midpoint()
    }

    #[test]
    fn empty_objectives_score_zero() {
        let evaluator = FitnessEvaluator::new(&fixed_model, &Objectives::new());
        assert_eq!(evaluator.evaluate(&params()).unwrap(), 0.0);
    }

    #[test]
    fn weighted_sum_with_normalization() {
        let objectives = Objectives::new()
            .maximize("efficiency")
            .maximize("power_output")
            .maximize("self_sufficiency")
            .minimize("specific_cost")
            .with_weight("efficiency", 2.0);
        let evaluator = FitnessEvaluator::new(&fixed_model, &objectives);

        // 2*0.4 + 50_000/100_000 + 0.5 + (1 - 800/1000)
        let expected = 0.8 + 0.5 + 0.5 + 0.2;
        let fitness = evaluator.evaluate(&params()).unwrap();
        assert!((fitness - expected).abs() < 1e-12, "fitness {fitness}");
        assert_eq!(evaluator.evaluations(), 1);
    }

    #[test]
    fn metric_names_are_accepted_as_aliases() {
        let by_alias = Objectives::new().maximize("overall_efficiency");
        let by_key = Objectives::new().maximize("efficiency");
        let a = FitnessEvaluator::new(&fixed_model, &by_alias);
        let b = FitnessEvaluator::new(&fixed_model, &by_key);
        assert_eq!(
            a.evaluate(&params()).unwrap(),
            b.evaluate(&params()).unwrap()
        );
    }

    #[test]
    fn unknown_objectives_are_ignored() {
        let objectives = Objectives::new()
            .maximize("efficiency")
            .maximize("happiness")
            .minimize("efficiency");
        let evaluator = FitnessEvaluator::new(&fixed_model, &objectives);
        assert!((evaluator.evaluate(&params()).unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn missing_cost_counts_as_zero() {
        let bare = |_: &ParameterAssignment| -> AdhtcResult<PerformanceRecord> {
            Ok(PerformanceRecord::new())
        };
        let objectives = Objectives::new().minimize("specific_cost");
        let evaluator = FitnessEvaluator::new(&bare, &objectives);
        assert_eq!(evaluator.evaluate(&params()).unwrap(), 1.0);
    }

    #[test]
    fn custom_reference_power() {
        let objectives = Objectives::new().maximize("power_output");
        let norm = Normalization {
            reference_power_kw: 25_000.0,
            ..Normalization::default()
        };
        let evaluator = FitnessEvaluator::with_normalization(&fixed_model, &objectives, norm);
        assert!((evaluator.evaluate(&params()).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn objectives_deserialize_with_defaults() {
        let objectives: Objectives =
            serde_json::from_str(r#"{"maximize": ["efficiency"]}"#).unwrap();
        assert!(objectives.minimize.is_empty());
        assert_eq!(objectives.weight("efficiency"), 1.0);
    }
}
