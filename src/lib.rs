//! Visual TSP Solver Library
//! 
//! Heuristic solvers for the travelling salesman variant with a fixed start
//! and a fixed end node.
//! 
//! # Features
//! 
//! - Network model with undirected, integer-cost candidate links
//! - Greedy nearest-neighbour route construction from start to end
//! - Steppable simulated annealing over a cyclic tour of points, with
//!   constant-time move pricing and optional reheating
//! 
//! # Example
//! 
//! ```no_run
//! use visual_tsp_solver::network::Network;
//! use visual_tsp_solver::heuristics::construction::{ConstructionHeuristic, GreedyConstruction};
//! use visual_tsp_solver::heuristics::annealing::{AnnealingConfig, SimulatedAnnealing};
//! 
//! let network = Network::from_file("network.json").unwrap();
//! let route = GreedyConstruction::new().construct(&network).unwrap();
//! println!("Greedy cost: {}", route.cost());
//! 
//! let cities = network.positions_of(route.nodes()).unwrap();
//! let mut sa = SimulatedAnnealing::with_seed(&cities, AnnealingConfig::default(), 42).unwrap();
//! while sa.temperature() > 1e-3 {
//!     sa.simulate();
//! }
//! println!("Annealed distance: {:.2}", sa.distance());
//! ```

pub mod error;
pub mod network;
pub mod route;
pub mod heuristics;

pub use error::SolverError;
pub use network::Network;
pub use route::Route;
