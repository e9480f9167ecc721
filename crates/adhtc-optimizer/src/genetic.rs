//! Generational genetic search with tournament selection, single-point
//! crossover and Gaussian mutation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use adhtc_types::{internal_error, settings_error, AdhtcResult};

use crate::cancel::CancellationToken;
use crate::fitness::FitnessEvaluator;
use crate::space::{ParameterAssignment, ParameterSpace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticSettings {
    pub population_size: usize,
    pub generations: usize,
    /// Per-variable mutation probability.
    pub mutation_rate: f64,
    /// Per-pair crossover probability.
    pub crossover_rate: f64,
    pub tournament_size: usize,
    /// Mutation standard deviation as a fraction of each variable's span.
    pub mutation_scale: f64,
    /// Fixed RNG seed; unseeded runs draw entropy from the OS.
    pub seed: Option<u64>,
    /// Evaluate each generation on the rayon pool.
    pub parallel: bool,
}

impl Default for GeneticSettings {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 100,
            mutation_rate: 0.1,
            crossover_rate: 0.8,
            tournament_size: 3,
            mutation_scale: 0.1,
            seed: None,
            parallel: false,
        }
    }
}

impl GeneticSettings {
    pub fn validate(&self) -> AdhtcResult<()> {
        if self.population_size == 0 {
            return Err(settings_error!("population_size must be at least 1"));
        }
        if self.generations == 0 {
            return Err(settings_error!("generations must be at least 1"));
        }
        if self.tournament_size == 0 {
            return Err(settings_error!("tournament_size must be at least 1"));
        }
        for (name, rate) in [
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(settings_error!("{name} must lie in [0, 1], got {rate}"));
            }
        }
        if !self.mutation_scale.is_finite() || self.mutation_scale < 0.0 {
            return Err(settings_error!(
                "mutation_scale must be a non-negative number, got {}",
                self.mutation_scale
            ));
        }
        Ok(())
    }
}

/// Best individual found by a genetic run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneticOutcome {
    pub best_parameters: ParameterAssignment,
    pub best_fitness: f64,
    /// Best-so-far fitness after each generation; never decreases.
    pub history: Vec<f64>,
    pub generations: usize,
}

pub struct GeneticOptimizer {
    settings: GeneticSettings,
}

impl GeneticOptimizer {
    pub fn new(settings: GeneticSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GeneticSettings {
        &self.settings
    }

    pub fn run(
        &self,
        space: &ParameterSpace,
        evaluator: &FitnessEvaluator<'_>,
        cancel: &CancellationToken,
    ) -> AdhtcResult<GeneticOutcome> {
        self.settings.validate()?;
        let settings = &self.settings;

        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mutation =
            GaussianMutation::new(space, settings.mutation_rate, settings.mutation_scale)?;

        info!(
            "Starting genetic search: population {}, generations {}, {} variables",
            settings.population_size,
            settings.generations,
            space.len()
        );

        let mut population: Vec<ParameterAssignment> = (0..settings.population_size)
            .map(|_| space.sample_uniform(&mut rng))
            .collect();

        let mut best: Option<(ParameterAssignment, f64)> = None;
        let mut history = Vec::with_capacity(settings.generations);

        for generation in 0..settings.generations {
            cancel.check(generation)?;

            let fitness = self.evaluate_population(&population, evaluator)?;
            for (individual, &score) in population.iter().zip(&fitness) {
                let improved = match &best {
                    None => true,
                    Some((_, best_score)) => rank(score) > rank(*best_score),
                };
                if improved {
                    best = Some((individual.clone(), score));
                }
            }

            let best_so_far = best.as_ref().map_or(f64::NEG_INFINITY, |(_, f)| *f);
            history.push(best_so_far);
            debug!("Generation {}: best fitness {:.6}", generation, best_so_far);

            // The last generation's offspring would never be evaluated.
            if generation + 1 == settings.generations {
                break;
            }

            let selected = tournament_select(
                &population,
                &fitness,
                settings.tournament_size,
                settings.population_size,
                &mut rng,
            );
            let children = crossover_pairs(space, selected, settings.crossover_rate, &mut rng)?;
            population = children
                .iter()
                .map(|child| mutation.apply(space, child, &mut rng))
                .collect::<AdhtcResult<_>>()?;
        }

        let (best_parameters, best_fitness) =
            best.ok_or_else(|| internal_error!("genetic search produced no individuals"))?;

        info!("Genetic search finished: best fitness {:.6}", best_fitness);

        Ok(GeneticOutcome {
            best_parameters,
            best_fitness,
            history,
            generations: settings.generations,
        })
    }

    fn evaluate_population(
        &self,
        population: &[ParameterAssignment],
        evaluator: &FitnessEvaluator<'_>,
    ) -> AdhtcResult<Vec<f64>> {
        if self.settings.parallel {
            population
                .par_iter()
                .map(|individual| evaluator.evaluate(individual))
                .collect()
        } else {
            population
                .iter()
                .map(|individual| evaluator.evaluate(individual))
                .collect()
        }
    }
}

/// Ordering key that sinks NaN fitness below every real score.
fn rank(fitness: f64) -> f64 {
    if fitness.is_nan() {
        f64::NEG_INFINITY
    } else {
        fitness
    }
}

/// Draw `count` winners, each the fittest of `size` uniform picks (with
/// replacement). The first drawn contestant wins ties.
pub(crate) fn tournament_select<R: Rng + ?Sized>(
    population: &[ParameterAssignment],
    fitness: &[f64],
    size: usize,
    count: usize,
    rng: &mut R,
) -> Vec<ParameterAssignment> {
    let len = population.len();
    (0..count)
        .map(|_| {
            let mut winner = rng.random_range(0..len);
            for _ in 1..size {
                let challenger = rng.random_range(0..len);
                if rank(fitness[challenger]) > rank(fitness[winner]) {
                    winner = challenger;
                }
            }
            population[winner].clone()
        })
        .collect()
}

/// Swap every value from `point` onward between two parents.
pub(crate) fn single_point_crossover(
    space: &ParameterSpace,
    first: &ParameterAssignment,
    second: &ParameterAssignment,
    point: usize,
) -> AdhtcResult<(ParameterAssignment, ParameterAssignment)> {
    let (a, b) = (first.values(), second.values());
    let child_a: Vec<f64> = a[..point].iter().chain(&b[point..]).copied().collect();
    let child_b: Vec<f64> = b[..point].iter().chain(&a[point..]).copied().collect();
    Ok((space.assign(child_a)?, space.assign(child_b)?))
}

/// Recombine disjoint adjacent pairs. A trailing odd individual, and every
/// pair when there is only one variable, passes through unchanged.
pub(crate) fn crossover_pairs<R: Rng + ?Sized>(
    space: &ParameterSpace,
    population: Vec<ParameterAssignment>,
    rate: f64,
    rng: &mut R,
) -> AdhtcResult<Vec<ParameterAssignment>> {
    let n_vars = space.len();
    let mut next = Vec::with_capacity(population.len());
    let mut parents = population.into_iter();

    while let Some(first) = parents.next() {
        let Some(second) = parents.next() else {
            next.push(first);
            break;
        };
        if n_vars > 1 && rng.random::<f64>() < rate {
            let point = rng.random_range(1..n_vars);
            let (child_a, child_b) = single_point_crossover(space, &first, &second, point)?;
            next.push(child_a);
            next.push(child_b);
        } else {
            next.push(first);
            next.push(second);
        }
    }

    Ok(next)
}

/// Per-variable Gaussian perturbation scaled to each variable's span.
pub(crate) struct GaussianMutation {
    rate: f64,
    noise: Vec<Normal<f64>>,
}

impl GaussianMutation {
    pub(crate) fn new(space: &ParameterSpace, rate: f64, scale: f64) -> AdhtcResult<Self> {
        let noise = space
            .parameters()
            .iter()
            .map(|p| {
                Normal::new(0.0, scale * p.span())
                    .map_err(|e| internal_error!("invalid mutation noise for '{}': {e}", p.name))
            })
            .collect::<AdhtcResult<Vec<_>>>()?;
        Ok(Self { rate, noise })
    }

    pub(crate) fn apply<R: Rng + ?Sized>(
        &self,
        space: &ParameterSpace,
        individual: &ParameterAssignment,
        rng: &mut R,
    ) -> AdhtcResult<ParameterAssignment> {
        let mut values = individual.values().to_vec();
        for (value, noise) in values.iter_mut().zip(&self.noise) {
            if rng.random::<f64>() < self.rate {
                *value += noise.sample(rng);
            }
        }
        space.assign(values)
    }
}
