//! Run configuration and unified optimization results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use adhtc_types::{config_error, AdhtcError, AdhtcResult, OptimizationError, PerformanceRecord};

use crate::constraints::Constraints;
use crate::convergence::ConvergenceReport;
use crate::fitness::{Normalization, Objectives};
use crate::genetic::GeneticSettings;
use crate::gradient::GradientSettings;
use crate::pareto::{ParetoSettings, ParetoSolution};
use crate::space::ParameterAssignment;

/// Unique optimization run identifier.
pub type RunId = Uuid;

/// Which search strategy to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OptimizationMethod {
    #[default]
    Genetic,
    Gradient,
    Pareto,
}

impl OptimizationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Genetic => "genetic",
            Self::Gradient => "gradient",
            Self::Pareto => "pareto",
        }
    }
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationMethod {
    type Err = AdhtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "genetic" => Ok(Self::Genetic),
            "gradient" => Ok(Self::Gradient),
            "pareto" => Ok(Self::Pareto),
            _ => Err(OptimizationError::UnsupportedMethod {
                method: s.to_string(),
            }
            .into()),
        }
    }
}

impl TryFrom<String> for OptimizationMethod {
    type Error = AdhtcError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OptimizationMethod> for String {
    fn from(method: OptimizationMethod) -> Self {
        method.as_str().to_string()
    }
}

/// Everything a single `optimize` call needs besides the space and model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    pub objectives: Objectives,
    /// Feasibility thresholds, applied by the Pareto sweep.
    pub constraints: Option<Constraints>,
    pub method: OptimizationMethod,
    pub normalization: Normalization,
    pub genetic: GeneticSettings,
    pub gradient: GradientSettings,
    pub pareto: ParetoSettings,
}

impl OptimizationConfig {
    pub fn new(objectives: Objectives, method: OptimizationMethod) -> Self {
        Self {
            objectives,
            method,
            ..Self::default()
        }
    }

    /// Load a run configuration from a JSON file. Omitted fields keep their
    /// defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> AdhtcResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| config_error!("invalid optimizer config {}: {e}", path.display()))
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn with_population_size(mut self, n: usize) -> Self {
        self.genetic.population_size = n;
        self
    }

    pub fn with_generations(mut self, n: usize) -> Self {
        self.genetic.generations = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.genetic.seed = Some(seed);
        self
    }

    pub fn with_grid_points(mut self, n: usize) -> Self {
        self.pareto.grid_points = n;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.genetic.parallel = parallel;
        self.pareto.parallel = parallel;
        self
    }
}

/// Result of a genetic or gradient run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestSolution {
    pub best_parameters: ParameterAssignment,
    pub best_fitness: f64,
    /// Model output at `best_parameters`, recomputed after the search.
    pub performance: PerformanceRecord,
    pub history: Vec<f64>,
    pub convergence: ConvergenceReport,
    /// Generations (genetic) or gradient steps taken.
    pub iterations: usize,
}

/// Result of a Pareto sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoFrontier {
    pub pareto_frontier: Vec<ParetoSolution>,
    pub candidates_evaluated: usize,
    pub feasible_candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_solutions: Option<Vec<ParetoSolution>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MethodOutcome {
    Best(BestSolution),
    Pareto(ParetoFrontier),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub id: RunId,
    pub method: OptimizationMethod,
    /// Number of performance-model calls made during the run.
    pub evaluations: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: MethodOutcome,
}

impl OptimizationResult {
    pub fn best(&self) -> Option<&BestSolution> {
        match &self.outcome {
            MethodOutcome::Best(best) => Some(best),
            MethodOutcome::Pareto(_) => None,
        }
    }

    pub fn pareto(&self) -> Option<&ParetoFrontier> {
        match &self.outcome {
            MethodOutcome::Pareto(front) => Some(front),
            MethodOutcome::Best(_) => None,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
