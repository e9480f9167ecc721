//! Command-line front end: optimizes the reference plant surrogate and prints
//! the result as JSON.

use std::path::PathBuf;
use std::time::Duration;

use adhtc_optimizer::{
    CancellationToken, Objectives, OptimizationConfig, OptimizationFacade, OptimizationMethod,
    PlantSurrogateModel, MAX_TURBINE_TEMP, PRESSURE_RATIO,
};
use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "adhtc-optimize")]
#[command(about = "Design optimization for the AD-HTC-Brayton hybrid plant")]
struct Args {
    /// JSON run configuration; command-line flags override its values
    #[arg(short, long, env = "ADHTC_OPTIMIZER_CONFIG")]
    config: Option<PathBuf>,

    /// Search strategy: genetic, gradient or pareto
    #[arg(short, long)]
    method: Option<OptimizationMethod>,

    /// Objective to maximize (repeatable)
    #[arg(long)]
    maximize: Vec<String>,

    /// Objective to minimize (repeatable)
    #[arg(long)]
    minimize: Vec<String>,

    /// Genetic population size
    #[arg(long)]
    population_size: Option<usize>,

    /// Genetic generation count
    #[arg(long)]
    generations: Option<usize>,

    /// RNG seed for reproducible genetic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Pareto samples per axis
    #[arg(long)]
    grid_points: Option<usize>,

    /// Evaluate candidates on the rayon thread pool
    #[arg(long)]
    parallel: bool,

    /// Abort the run after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Logging level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = build_config(&args)?;
    let space = PlantSurrogateModel::parameter_space()?;
    let cancel = match args.timeout_secs {
        Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
        None => CancellationToken::new(),
    };

    info!(
        "Optimizing {} plant variables with the {} method",
        space.len(),
        config.method
    );

    let facade =
        OptimizationFacade::new(space, PlantSurrogateModel::default()).with_cancellation(cancel);
    let result = facade.optimize(&config)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<OptimizationConfig> {
    let mut config = match &args.config {
        Some(path) => OptimizationConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => OptimizationConfig::default(),
    };

    if let Some(method) = args.method {
        config.method = method;
    }
    if !args.maximize.is_empty() || !args.minimize.is_empty() {
        config.objectives.maximize = args.maximize.clone();
        config.objectives.minimize = args.minimize.clone();
    }
    if let Some(n) = args.population_size {
        config = config.with_population_size(n);
    }
    if let Some(n) = args.generations {
        config = config.with_generations(n);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(n) = args.grid_points {
        config = config.with_grid_points(n);
    }
    if args.parallel {
        config = config.with_parallel(true);
    }

    apply_plant_presets(&mut config);
    Ok(config)
}

/// Fill what the user left open with the plant's nominal design choices.
fn apply_plant_presets(config: &mut OptimizationConfig) {
    if config.objectives.is_empty() {
        config.objectives = Objectives::new()
            .maximize("efficiency")
            .maximize("self_sufficiency")
            .minimize("specific_cost");
    }

    match config.method {
        OptimizationMethod::Gradient if config.gradient.initial_guess.is_empty() => {
            config.gradient.initial_guess = PlantSurrogateModel::initial_guess();
        }
        OptimizationMethod::Pareto if config.pareto.primary_variables.is_none() => {
            config.pareto.primary_variables =
                Some((PRESSURE_RATIO.to_string(), MAX_TURBINE_TEMP.to_string()));
            if config.pareto.fixed_values.is_empty() {
                config.pareto.fixed_values = PlantSurrogateModel::pareto_fixed_values();
            }
        }
        _ => {}
    }
}
