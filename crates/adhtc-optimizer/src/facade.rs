//! Single entry point that dispatches to the search strategies.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use adhtc_types::AdhtcResult;

use crate::cancel::CancellationToken;
use crate::convergence::ConvergenceReport;
use crate::fitness::FitnessEvaluator;
use crate::genetic::GeneticOptimizer;
use crate::gradient::GradientOptimizer;
use crate::model::PerformanceModel;
use crate::pareto::ParetoOptimizer;
use crate::run::{
    BestSolution, MethodOutcome, OptimizationConfig, OptimizationMethod, OptimizationResult,
    ParetoFrontier,
};
use crate::space::{ParameterAssignment, ParameterSpace};

/// Runs optimizations of one plant model over one parameter space.
///
/// Each [`optimize`](Self::optimize) call builds its own population, RNG and
/// counters, so a facade can be shared between threads.
pub struct OptimizationFacade<M> {
    space: ParameterSpace,
    model: M,
    cancel: CancellationToken,
}

impl<M: PerformanceModel> OptimizationFacade<M> {
    pub fn new(space: ParameterSpace, model: M) -> Self {
        Self {
            space,
            model,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort runs cooperatively once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn optimize(&self, config: &OptimizationConfig) -> AdhtcResult<OptimizationResult> {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Starting {} optimization run {}", config.method, id);

        if config.objectives.is_empty() && config.method != OptimizationMethod::Pareto {
            warn!("No objectives given: every candidate scores 0");
        }

        let evaluator = FitnessEvaluator::with_normalization(
            &self.model,
            &config.objectives,
            config.normalization,
        );

        let outcome = match config.method {
            OptimizationMethod::Genetic => {
                let run = GeneticOptimizer::new(config.genetic.clone()).run(
                    &self.space,
                    &evaluator,
                    &self.cancel,
                )?;
                self.best_solution(
                    &evaluator,
                    run.best_parameters,
                    run.best_fitness,
                    run.history,
                    run.generations,
                )?
            }
            OptimizationMethod::Gradient => {
                let run = GradientOptimizer::new(config.gradient.clone()).run(
                    &self.space,
                    &evaluator,
                    &self.cancel,
                )?;
                self.best_solution(
                    &evaluator,
                    run.best_parameters,
                    run.best_fitness,
                    run.history,
                    run.iterations,
                )?
            }
            OptimizationMethod::Pareto => {
                let run = ParetoOptimizer::new(config.pareto.clone()).run(
                    &self.space,
                    &evaluator,
                    config.constraints.as_ref(),
                    &self.cancel,
                )?;
                MethodOutcome::Pareto(ParetoFrontier {
                    pareto_frontier: run.frontier,
                    candidates_evaluated: run.candidates_evaluated,
                    feasible_candidates: run.feasible_candidates,
                    all_solutions: run.all_solutions,
                })
            }
        };

        let finished_at = Utc::now();
        let result = OptimizationResult {
            id,
            method: config.method,
            evaluations: evaluator.evaluations(),
            started_at,
            finished_at,
            outcome,
        };
        info!(
            "Optimization run {} finished in {} ms ({} model evaluations)",
            id,
            result.duration_ms(),
            result.evaluations
        );
        Ok(result)
    }

    fn best_solution(
        &self,
        evaluator: &FitnessEvaluator<'_>,
        best_parameters: ParameterAssignment,
        best_fitness: f64,
        history: Vec<f64>,
        iterations: usize,
    ) -> AdhtcResult<MethodOutcome> {
        let performance = evaluator.performance(&best_parameters)?;
        let convergence = ConvergenceReport::from_history(&history);
        Ok(MethodOutcome::Best(BestSolution {
            best_parameters,
            best_fitness,
            performance,
            history,
            convergence,
            iterations,
        }))
    }
}
