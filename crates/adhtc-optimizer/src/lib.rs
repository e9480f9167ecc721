//! # adhtc-optimizer
//!
//! Multi-objective design optimization for the AD-HTC-Brayton hybrid plant.
//!
//! Provides the bounded design space, the performance-model contract with a
//! reference plant surrogate, weighted fitness scoring, feasibility checks,
//! and three search strategies (genetic, gradient ascent, Pareto grid sweep)
//! behind a single [`OptimizationFacade`].

mod cancel;
mod constraints;
mod convergence;
mod facade;
mod fitness;
mod genetic;
mod gradient;
mod model;
mod pareto;
mod run;
mod space;

pub use cancel::CancellationToken;
pub use constraints::{ConstraintChecker, Constraints};
pub use convergence::{ConvergenceReport, CONVERGENCE_VARIANCE, CONVERGENCE_WINDOW};
pub use facade::OptimizationFacade;
pub use fitness::{FitnessEvaluator, Normalization, Objectives};
pub use genetic::{GeneticOptimizer, GeneticOutcome, GeneticSettings};
pub use gradient::{GradientOptimizer, GradientOutcome, GradientSettings};
pub use model::{
    PerformanceModel, PlantSurrogateModel, AD_RETENTION_TIME, COMPRESSOR_EFFICIENCY,
    HTC_RESIDENCE_TIME, HTC_TEMPERATURE, MAX_TURBINE_TEMP, PRESSURE_RATIO, TURBINE_EFFICIENCY,
};
pub use pareto::{
    non_dominated, ObjectiveValues, ParetoOptimizer, ParetoOutcome, ParetoSettings,
    ParetoSolution,
};
pub use run::{
    BestSolution, MethodOutcome, OptimizationConfig, OptimizationMethod, OptimizationResult,
    ParetoFrontier, RunId,
};
pub use space::{ParameterAssignment, ParameterDef, ParameterSpace, ParameterSpaceBuilder};
