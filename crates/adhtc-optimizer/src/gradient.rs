//! Bounded gradient ascent on central finite differences.
//!
//! This is local hill climbing: it settles on whichever optimum is uphill of
//! the starting guess.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use adhtc_types::{settings_error, AdhtcResult};

use crate::cancel::CancellationToken;
use crate::fitness::FitnessEvaluator;
use crate::space::{ParameterAssignment, ParameterSpace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientSettings {
    /// Starting point by variable name; unnamed variables start mid-range.
    pub initial_guess: HashMap<String, f64>,
    pub learning_rate: f64,
    pub max_iterations: usize,
    /// Stop once a step moves less than this (Euclidean norm).
    pub tolerance: f64,
    /// Finite-difference probe offset.
    pub step_size: f64,
}

impl Default for GradientSettings {
    fn default() -> Self {
        Self {
            initial_guess: HashMap::new(),
            learning_rate: 0.1,
            max_iterations: 1000,
            tolerance: 1e-6,
            step_size: 1e-5,
        }
    }
}

impl GradientSettings {
    pub fn validate(&self) -> AdhtcResult<()> {
        if self.max_iterations == 0 {
            return Err(settings_error!("max_iterations must be at least 1"));
        }
        for (name, value) in [
            ("learning_rate", self.learning_rate),
            ("tolerance", self.tolerance),
            ("step_size", self.step_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(settings_error!("{name} must be positive, got {value}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientOutcome {
    pub best_parameters: ParameterAssignment,
    pub best_fitness: f64,
    /// Fitness after each accepted step.
    pub history: Vec<f64>,
    pub iterations: usize,
    /// Whether the run stopped because a step fell under the tolerance.
    pub converged_early: bool,
    /// Norm of the last step computed, accepted or not.
    pub last_step_norm: f64,
}

pub struct GradientOptimizer {
    settings: GradientSettings,
}

impl GradientOptimizer {
    pub fn new(settings: GradientSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GradientSettings {
        &self.settings
    }

    pub fn run(
        &self,
        space: &ParameterSpace,
        evaluator: &FitnessEvaluator<'_>,
        cancel: &CancellationToken,
    ) -> AdhtcResult<GradientOutcome> {
        self.settings.validate()?;
        let settings = &self.settings;

        let mut x = space.assign_named(&settings.initial_guess)?;
        let mut history = Vec::new();
        let mut iterations = 0;
        let mut converged_early = false;
        let mut last_step_norm = f64::INFINITY;

        info!(
            "Starting gradient ascent over {} variables (max {} iterations)",
            space.len(),
            settings.max_iterations
        );

        for iteration in 0..settings.max_iterations {
            cancel.check(iteration)?;
            iterations = iteration + 1;

            let gradient = self.numerical_gradient(space, &x, evaluator)?;
            let stepped: Vec<f64> = x
                .values()
                .iter()
                .zip(&gradient)
                .map(|(xi, gi)| xi + settings.learning_rate * gi)
                .collect();
            let x_new = space.assign(stepped)?;

            last_step_norm = euclidean_distance(x_new.values(), x.values());
            if last_step_norm < settings.tolerance {
                converged_early = true;
                debug!(
                    "Step norm {:e} below tolerance after {} iterations",
                    last_step_norm, iterations
                );
                break;
            }

            x = x_new;
            let fitness = evaluator.evaluate(&x)?;
            history.push(fitness);
            debug!(
                "Iteration {}: fitness {:.6}, step {:e}",
                iteration, fitness, last_step_norm
            );
        }

        let best_fitness = match history.last() {
            Some(&fitness) => fitness,
            None => evaluator.evaluate(&x)?,
        };

        info!(
            "Gradient ascent finished after {} iterations: fitness {:.6}",
            iterations, best_fitness
        );

        Ok(GradientOutcome {
            best_parameters: x,
            best_fitness,
            history,
            iterations,
            converged_early,
            last_step_norm,
        })
    }

    /// Central differences per dimension. Probes are rebuilt through the
    /// space, so they never leave the bounds; on a bound the difference is
    /// taken over the clipped spread.
    fn numerical_gradient(
        &self,
        space: &ParameterSpace,
        x: &ParameterAssignment,
        evaluator: &FitnessEvaluator<'_>,
    ) -> AdhtcResult<Vec<f64>> {
        let h = self.settings.step_size;
        let mut gradient = Vec::with_capacity(x.len());

        for i in 0..x.len() {
            let mut plus = x.values().to_vec();
            let mut minus = x.values().to_vec();
            plus[i] += h;
            minus[i] -= h;
            let plus = space.assign(plus)?;
            let minus = space.assign(minus)?;

            let spread = plus.values()[i] - minus.values()[i];
            if spread <= 0.0 {
                gradient.push(0.0);
                continue;
            }
            let f_plus = evaluator.evaluate(&plus)?;
            let f_minus = evaluator.evaluate(&minus)?;
            gradient.push((f_plus - f_minus) / spread);
        }

        Ok(gradient)
    }
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
