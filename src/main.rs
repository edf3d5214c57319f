//! Visual TSP Solver - Command Line Interface
//!
//! Drives the greedy constructor and the annealing engine over network files.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rayon::prelude::*;
use serde::Serialize;
use visual_tsp_solver::error::{Result, SolverError};
use visual_tsp_solver::heuristics::annealing::{AnnealingConfig, SimulatedAnnealing};
use visual_tsp_solver::heuristics::construction::{ConstructionHeuristic, GreedyConstruction};
use visual_tsp_solver::network::{Network, Point};

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "visual-tsp-solver")]
#[command(version = "1.0")]
#[command(about = "Greedy and simulated annealing solvers for start-to-end TSP networks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a start-to-end route with the greedy heuristic
    Greedy {
        /// Path to the network JSON file
        #[arg(short, long)]
        network: PathBuf,

        /// Write the route as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every link of the route
        #[arg(short, long)]
        verbose: bool,
    },

    /// Anneal a closed tour through the node positions
    Anneal {
        /// Path to the network JSON file
        #[arg(short, long)]
        network: PathBuf,

        /// Number of annealing steps per run
        #[arg(long, default_value = "10000")]
        steps: usize,

        /// Independent runs, executed in parallel
        #[arg(short, long, default_value = "1")]
        runs: usize,

        /// Random seed; run i uses seed + i
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Annealing configuration JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the initial temperature
        #[arg(long)]
        initial_temperature: Option<f64>,

        /// Override the per-step temperature decay
        #[arg(long)]
        decay: Option<f64>,

        /// Reheat once the temperature gets too low
        #[arg(long)]
        reheat: bool,

        /// Start from the greedy route order instead of node order
        #[arg(long)]
        from_greedy: bool,

        /// Write a CSV trace of the first run
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Steps between trace rows
        #[arg(long, default_value = "100")]
        trace_every: usize,

        /// Write the best run as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print statistics about a network
    Analyze {
        /// Path to the network JSON file
        #[arg(short, long)]
        network: PathBuf,
    },
}

/// One row of the annealing trace
#[derive(Debug, Serialize)]
struct TraceRow {
    iteration: usize,
    temperature: f64,
    distance: f64,
    best_distance: f64,
    last_move: &'static str,
    accepted: bool,
}

/// Outcome of one annealing run
#[derive(Debug, Clone, Serialize)]
struct AnnealOutcome {
    seed: u64,
    iterations: usize,
    temperature: f64,
    distance: f64,
    best_distance: f64,
    tour: Vec<Point>,
    labels: Vec<String>,
    computation_time: f64,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Greedy { network, output, verbose } => run_greedy(&network, output, verbose),

        Commands::Anneal {
            network,
            steps,
            runs,
            seed,
            config,
            initial_temperature,
            decay,
            reheat,
            from_greedy,
            trace,
            trace_every,
            output,
        } => load_config(config.as_deref(), initial_temperature, decay, reheat).and_then(|config| {
            run_anneal(&network, config, steps, runs.max(1), seed, from_greedy, trace, trace_every, output)
        }),

        Commands::Analyze { network } => analyze_network(&network),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_network(path: &Path) -> Result<Network> {
    println!("Loading network from {:?}...", path);
    Network::from_file(path)
}

fn load_config(
    path: Option<&Path>,
    initial_temperature: Option<f64>,
    decay: Option<f64>,
    reheat: bool,
) -> Result<AnnealingConfig> {
    let mut config = match path {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => AnnealingConfig::default(),
    };

    if let Some(t) = initial_temperature {
        config.initial_temperature = t;
    }
    if let Some(d) = decay {
        config.temperature_decay = d;
    }
    if reheat {
        config.reheat_when_cool = true;
    }

    config.validate()?;
    Ok(config)
}

fn run_greedy(path: &Path, output: Option<PathBuf>, verbose: bool) -> Result<()> {
    let network = load_network(path)?;

    let greedy = GreedyConstruction::new();
    let route = greedy.construct(&network)?;

    println!("\n========== Results ==========");
    println!("Algorithm: {}", route.algorithm);
    println!("Cost: {}", route.cost());
    println!("Links: {}", route.len());
    println!("Time: {:.4}s", route.computation_time);
    println!("Route: {}", route.describe(&network));

    if verbose {
        for link in route.links() {
            println!(
                "  link {}: {} - {} (cost {})",
                link.id,
                network.label(link.start),
                network.label(link.end),
                link.cost
            );
        }
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&route)?;
        std::fs::write(&out_path, json)?;
        println!("\nRoute saved to {:?}", out_path);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_anneal(
    path: &Path,
    config: AnnealingConfig,
    steps: usize,
    runs: usize,
    seed: u64,
    from_greedy: bool,
    trace: Option<PathBuf>,
    trace_every: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    let network = load_network(path)?;

    let positions = if from_greedy {
        let route = GreedyConstruction::new().construct(&network)?;
        info!("Starting from greedy order (cost {})", route.cost());
        network.positions_of(route.nodes())
    } else {
        network.positions()
    };
    let cities = positions.ok_or_else(|| SolverError::InvalidParameter {
        name: "network",
        reason: "every node needs a position to anneal".to_string(),
    })?;

    println!("Annealing {} cities, {} run(s) of {} steps...", cities.len(), runs, steps);

    let progress = ProgressBar::new(total_steps(steps, runs));
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} steps ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let outcomes: Vec<AnnealOutcome> = (0..runs as u64)
        .into_par_iter()
        .map(|run| -> Result<AnnealOutcome> {
            let trace_path = if run == 0 { trace.as_deref() } else { None };
            anneal_once(&network, &cities, config, steps, run_seed(seed, run), trace_path, trace_every, &progress)
        })
        .collect::<Result<Vec<_>>>()?;

    progress.finish_and_clear();

    for outcome in &outcomes {
        info!(
            "seed {}: distance {:.2}, best {:.2}, temperature {:.5}",
            outcome.seed, outcome.distance, outcome.best_distance, outcome.temperature
        );
    }

    let Some(best) = outcomes
        .iter()
        .min_by(|a, b| a.best_distance.total_cmp(&b.best_distance))
    else {
        return Ok(());
    };

    println!("\n========== Results ==========");
    println!("Algorithm: SimulatedAnnealing");
    println!("Best seed: {}", best.seed);
    println!("Iterations: {}", best.iterations);
    println!("Final temperature: {:.5}", best.temperature);
    println!("Current distance: {:.2}", best.distance);
    println!("Best distance: {:.2}", best.best_distance);
    println!("Time: {:.4}s", best.computation_time);
    println!("Tour: {}", best.labels.join(" -> "));

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(best)?;
        std::fs::write(&out_path, json)?;
        println!("\nTour saved to {:?}", out_path);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn anneal_once(
    network: &Network,
    cities: &[Point],
    config: AnnealingConfig,
    steps: usize,
    seed: u64,
    trace: Option<&Path>,
    trace_every: usize,
    progress: &ProgressBar,
) -> Result<AnnealOutcome> {
    let timer = Instant::now();
    let mut sa = SimulatedAnnealing::with_seed(cities, config, seed)?;

    let mut writer = match trace {
        Some(path) => Some(csv::Writer::from_path(path).map_err(csv_error)?),
        None => None,
    };
    let trace_every = trace_every.max(1);

    for _ in 0..steps {
        let step = sa.simulate();

        if let Some(writer) = writer.as_mut() {
            if sa.iteration() % trace_every == 0 {
                writer
                    .serialize(TraceRow {
                        iteration: sa.iteration(),
                        temperature: sa.temperature(),
                        distance: sa.distance(),
                        best_distance: sa.best_distance(),
                        last_move: step.mv.map_or("none", |mv| mv.kind()),
                        accepted: step.accepted,
                    })
                    .map_err(csv_error)?;
            }
        }

        if sa.iteration() % 1000 == 0 {
            progress.inc(1000);
        }
    }
    progress.inc((steps % 1000) as u64);

    if let Some(mut writer) = writer {
        writer.flush()?;
    }

    let tour = sa.best_cities().to_vec();
    let labels = tour.iter().map(|p| label_at(network, p)).collect();

    Ok(AnnealOutcome {
        seed,
        iterations: sa.iteration(),
        temperature: sa.temperature(),
        distance: sa.distance(),
        best_distance: sa.best_distance(),
        tour,
        labels,
        computation_time: timer.elapsed().as_secs_f64(),
    })
}

/// Steps across all runs, saturating instead of overflowing
fn total_steps(steps: usize, runs: usize) -> u64 {
    (steps as u64).saturating_mul(runs as u64)
}

/// Seed of run `run`; wraps past `u64::MAX`
fn run_seed(seed: u64, run: u64) -> u64 {
    seed.wrapping_add(run)
}

/// Label of the first node placed at `point`
fn label_at(network: &Network, point: &Point) -> String {
    network
        .nodes
        .iter()
        .find(|n| n.position.as_ref() == Some(point))
        .map(|n| n.name.clone())
        .unwrap_or_else(|| format!("({:.1}, {:.1})", point.x, point.y))
}

fn csv_error(e: csv::Error) -> SolverError {
    SolverError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}

fn analyze_network(path: &Path) -> Result<()> {
    let network = load_network(path)?;
    println!("{}", network.statistics());

    match GreedyConstruction::new().construct(&network) {
        Ok(route) => println!("Greedy route: {} (cost {})", route.describe(&network), route.cost()),
        Err(SolverError::NoFeasiblePath { from, remaining }) => println!(
            "Greedy route: none (stuck at {} with {} node(s) left)",
            network.label(from),
            remaining
        ),
        Err(e) => return Err(e),
    }

    Ok(())
}
