//! Heuristics module for start-to-end TSP.
//! 
//! This module exports the construction heuristic and the annealing engine.

pub mod construction;
pub mod annealing;

pub use construction::*;
pub use annealing::*;
