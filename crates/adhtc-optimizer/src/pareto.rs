//! Pareto-frontier enumeration over a two-variable design grid.
//!
//! Two primary variables are swept on an `n × n` grid while every other
//! variable is held fixed. The dominance filter compares every pair of
//! feasible candidates, so the cost grows as `O(n⁴)`: about 6M comparisons at
//! the default `n = 50`, but a few hundred points per axis is already slow.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use adhtc_types::{settings_error, AdhtcResult, PerformanceRecord};

use crate::cancel::CancellationToken;
use crate::constraints::{ConstraintChecker, Constraints};
use crate::fitness::FitnessEvaluator;
use crate::space::{ParameterAssignment, ParameterSpace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParetoSettings {
    /// Samples per primary axis.
    pub grid_points: usize,
    /// The two swept variables; defaults to the first two of the space.
    pub primary_variables: Option<(String, String)>,
    /// Values for the variables held fixed; unnamed ones sit mid-range.
    pub fixed_values: HashMap<String, f64>,
    /// Also return every feasible candidate, not just the frontier.
    pub include_all_solutions: bool,
    /// Evaluate each grid row on the rayon pool.
    pub parallel: bool,
}

impl Default for ParetoSettings {
    fn default() -> Self {
        Self {
            grid_points: 50,
            primary_variables: None,
            fixed_values: HashMap::new(),
            include_all_solutions: false,
            parallel: false,
        }
    }
}

/// The three competing objectives a candidate is judged on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveValues {
    pub efficiency: f64,
    /// Net power, kW.
    pub power: f64,
    /// Specific cost, $/kW.
    pub cost: f64,
}

impl ObjectiveValues {
    pub fn from_performance(performance: &PerformanceRecord) -> Self {
        Self {
            efficiency: performance.overall_efficiency(),
            power: performance.net_power_kw(),
            cost: performance.specific_cost(),
        }
    }

    /// `self` is at least as good everywhere and strictly better somewhere.
    pub fn dominates(&self, other: &Self) -> bool {
        let no_worse = self.efficiency >= other.efficiency
            && self.power >= other.power
            && self.cost <= other.cost;
        let better = self.efficiency > other.efficiency
            || self.power > other.power
            || self.cost < other.cost;
        no_worse && better
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoSolution {
    pub parameters: ParameterAssignment,
    pub performance: PerformanceRecord,
    pub objectives: ObjectiveValues,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParetoOutcome {
    /// Non-dominated solutions, highest efficiency first.
    pub frontier: Vec<ParetoSolution>,
    pub candidates_evaluated: usize,
    pub feasible_candidates: usize,
    pub all_solutions: Option<Vec<ParetoSolution>>,
}

/// Keep the solutions no other solution dominates, sorted by efficiency
/// (descending, stable for ties).
pub fn non_dominated(solutions: &[ParetoSolution]) -> Vec<ParetoSolution> {
    let mut front: Vec<ParetoSolution> = solutions
        .iter()
        .filter(|candidate| {
            !solutions
                .iter()
                .any(|other| other.objectives.dominates(&candidate.objectives))
        })
        .cloned()
        .collect();
    front.sort_by(|a, b| b.objectives.efficiency.total_cmp(&a.objectives.efficiency));
    front
}

pub struct ParetoOptimizer {
    settings: ParetoSettings,
}

impl ParetoOptimizer {
    pub fn new(settings: ParetoSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ParetoSettings {
        &self.settings
    }

    pub fn run(
        &self,
        space: &ParameterSpace,
        evaluator: &FitnessEvaluator<'_>,
        constraints: Option<&Constraints>,
        cancel: &CancellationToken,
    ) -> AdhtcResult<ParetoOutcome> {
        let settings = &self.settings;
        if settings.grid_points == 0 {
            return Err(settings_error!("grid_points must be at least 1"));
        }
        let (first, second) = self.primary_indices(space)?;
        let base = space.assign_named(&settings.fixed_values)?;

        let axis_a = space.parameters()[first].linspace(settings.grid_points);
        let axis_b = space.parameters()[second].linspace(settings.grid_points);

        info!(
            "Starting Pareto sweep: {} x {} grid over '{}' and '{}'",
            axis_a.len(),
            axis_b.len(),
            space.parameters()[first].name,
            space.parameters()[second].name
        );

        let mut feasible = Vec::new();
        let mut candidates_evaluated = 0;

        for (row, &a) in axis_a.iter().enumerate() {
            cancel.check(row)?;

            let points = axis_b
                .iter()
                .map(|&b| {
                    let mut values = base.values().to_vec();
                    values[first] = a;
                    values[second] = b;
                    space.assign(values)
                })
                .collect::<AdhtcResult<Vec<_>>>()?;

            let performances: Vec<PerformanceRecord> = if settings.parallel {
                points
                    .par_iter()
                    .map(|p| evaluator.performance(p))
                    .collect::<AdhtcResult<_>>()?
            } else {
                points
                    .iter()
                    .map(|p| evaluator.performance(p))
                    .collect::<AdhtcResult<_>>()?
            };
            candidates_evaluated += points.len();

            for (parameters, performance) in points.into_iter().zip(performances) {
                if let Some(c) = constraints {
                    if !ConstraintChecker::is_feasible(&performance, c) {
                        continue;
                    }
                }
                feasible.push(ParetoSolution {
                    objectives: ObjectiveValues::from_performance(&performance),
                    parameters,
                    performance,
                });
            }
        }

        debug!(
            "{} of {} grid points feasible",
            feasible.len(),
            candidates_evaluated
        );

        let frontier = non_dominated(&feasible);
        info!(
            "Pareto sweep finished: {} non-dominated solutions",
            frontier.len()
        );

        Ok(ParetoOutcome {
            frontier,
            candidates_evaluated,
            feasible_candidates: feasible.len(),
            all_solutions: settings.include_all_solutions.then_some(feasible),
        })
    }

    fn primary_indices(&self, space: &ParameterSpace) -> AdhtcResult<(usize, usize)> {
        let (first, second) = match &self.settings.primary_variables {
            Some((a, b)) => {
                let find = |name: &str| {
                    space
                        .index_of(name)
                        .ok_or_else(|| settings_error!("unknown primary variable '{name}'"))
                };
                (find(a)?, find(b)?)
            }
            None if space.len() >= 2 => (0, 1),
            None => {
                return Err(settings_error!(
                    "Pareto sweep needs at least two variables, space has {}",
                    space.len()
                ))
            }
        };
        if first == second {
            return Err(settings_error!("primary variables must differ"));
        }
        Ok((first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::Objectives;
    use crate::model::{PlantSurrogateModel, MAX_TURBINE_TEMP, PRESSURE_RATIO};
    use adhtc_types::{metrics, AdhtcError};

    fn objectives(efficiency: f64, power: f64, cost: f64) -> ObjectiveValues {
        ObjectiveValues {
            efficiency,
            power,
            cost,
        }
    }

    fn plant_settings(grid_points: usize) -> ParetoSettings {
        ParetoSettings {
            grid_points,
            primary_variables: Some((PRESSURE_RATIO.into(), MAX_TURBINE_TEMP.into())),
            fixed_values: PlantSurrogateModel::pareto_fixed_values(),
            ..ParetoSettings::default()
        }
    }

    fn assert_mutually_non_dominated(front: &[ParetoSolution]) {
        for a in front {
            for b in front {
                assert!(
                    !a.objectives.dominates(&b.objectives),
                    "{:?} dominates {:?}",
                    a.objectives,
                    b.objectives
                );
            }
        }
    }

    #[test]
    fn dominance_requires_a_strict_improvement() {
        let base = objectives(0.3, 100.0, 900.0);
        assert!(!base.dominates(&base));
        assert!(objectives(0.31, 100.0, 900.0).dominates(&base));
        assert!(objectives(0.3, 100.0, 899.0).dominates(&base));
        // better efficiency, worse cost: trade-off
        assert!(!objectives(0.4, 100.0, 950.0).dominates(&base));
        assert!(!base.dominates(&objectives(0.4, 100.0, 950.0)));
    }

    #[test]
    fn plant_frontier_is_non_dominated_and_sorted() {
        let space = PlantSurrogateModel::parameter_space().unwrap();
        let model = PlantSurrogateModel::default();
        let evaluator = FitnessEvaluator::new(&model, &Objectives::new());
        let outcome = ParetoOptimizer::new(plant_settings(12))
            .run(&space, &evaluator, None, &CancellationToken::new())
            .unwrap();

        assert_eq!(outcome.candidates_evaluated, 144);
        assert_eq!(outcome.feasible_candidates, 144);
        assert_eq!(evaluator.evaluations(), 144);
        assert!(!outcome.frontier.is_empty());
        assert!(outcome.all_solutions.is_none());
        assert_mutually_non_dominated(&outcome.frontier);
        assert!(outcome
            .frontier
            .windows(2)
            .all(|w| w[0].objectives.efficiency >= w[1].objectives.efficiency));
        for solution in &outcome.frontier {
            assert!(space.contains(&solution.parameters));
            assert_eq!(solution.parameters.get("htc_temperature"), Some(473.0));
        }
    }

    #[test]
    fn constraints_filter_candidates() {
        let space = PlantSurrogateModel::parameter_space().unwrap();
        let model = PlantSurrogateModel::default();
        let evaluator = FitnessEvaluator::new(&model, &Objectives::new());
        let constraints = Constraints::new()
            .with_max_cost(1100.0)
            .with_min_efficiency(0.3);

        let mut settings = plant_settings(10);
        settings.include_all_solutions = true;
        let outcome = ParetoOptimizer::new(settings)
            .run(
                &space,
                &evaluator,
                Some(&constraints),
                &CancellationToken::new(),
            )
            .unwrap();

        assert!(outcome.feasible_candidates < outcome.candidates_evaluated);
        let all = outcome.all_solutions.as_ref().unwrap();
        assert_eq!(all.len(), outcome.feasible_candidates);
        for solution in all.iter().chain(&outcome.frontier) {
            assert!(ConstraintChecker::is_feasible(&solution.performance, &constraints));
        }
    }

    #[test]
    fn infeasible_everywhere_gives_empty_front() {
        let space = PlantSurrogateModel::parameter_space().unwrap();
        let model = PlantSurrogateModel::default();
        let evaluator = FitnessEvaluator::new(&model, &Objectives::new());
        let impossible = Constraints::new().with_min_efficiency(2.0);
        let outcome = ParetoOptimizer::new(plant_settings(4))
            .run(
                &space,
                &evaluator,
                Some(&impossible),
                &CancellationToken::new(),
            )
            .unwrap();
        assert!(outcome.frontier.is_empty());
        assert_eq!(outcome.candidates_evaluated, 16);
    }

    #[test]
    fn parallel_sweep_matches_serial() {
        let space = PlantSurrogateModel::parameter_space().unwrap();
        let model = PlantSurrogateModel::default();
        let run = |parallel: bool| {
            let evaluator = FitnessEvaluator::new(&model, &Objectives::new());
            let mut settings = plant_settings(8);
            settings.parallel = parallel;
            ParetoOptimizer::new(settings)
                .run(&space, &evaluator, None, &CancellationToken::new())
                .unwrap()
        };
        assert_eq!(run(false), run(true));
    }

    #[test]
    fn primary_variables_are_validated() {
        let space = PlantSurrogateModel::parameter_space().unwrap();
        let model = PlantSurrogateModel::default();
        let evaluator = FitnessEvaluator::new(&model, &Objectives::new());

        let same = ParetoSettings {
            primary_variables: Some((PRESSURE_RATIO.into(), PRESSURE_RATIO.into())),
            ..ParetoSettings::default()
        };
        let unknown = ParetoSettings {
            primary_variables: Some((PRESSURE_RATIO.into(), "stack_height".into())),
            ..ParetoSettings::default()
        };
        for settings in [same, unknown] {
            let err = ParetoOptimizer::new(settings)
                .run(&space, &evaluator, None, &CancellationToken::new())
                .unwrap_err();
            assert!(matches!(err, AdhtcError::Optimization(_)));
        }

        let single = ParameterSpace::builder()
            .add("x", 0.0, 1.0)
            .build()
            .unwrap();
        assert!(ParetoOptimizer::new(ParetoSettings::default())
            .run(&single, &evaluator, None, &CancellationToken::new())
            .is_err());
    }

    #[test]
    fn equal_objectives_are_both_kept() {
        let space = ParameterSpace::builder()
            .add("x", 0.0, 1.0)
            .add("y", 0.0, 1.0)
            .build()
            .unwrap();
        let flat = |_: &ParameterAssignment| -> AdhtcResult<PerformanceRecord> {
            Ok(PerformanceRecord::new().with(metrics::OVERALL_EFFICIENCY, 0.3))
        };
        let evaluator = FitnessEvaluator::new(&flat, &Objectives::new());
        let outcome = ParetoOptimizer::new(ParetoSettings {
            grid_points: 3,
            ..ParetoSettings::default()
        })
        .run(&space, &evaluator, None, &CancellationToken::new())
        .unwrap();
        assert_eq!(outcome.frontier.len(), 9);
    }
}
