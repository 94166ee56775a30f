//! # Register Allocation Utilities
//!
//! This module implements graph coloring register allocation algorithm
//! and its utilities.
//!
//! - `liveness_analysis`: Liveness analysis (live before/after every
//!   instruction).
//! - `interference_graph`: Interference graph construction.
//! - `graph_coloring_allocation`: Saturation-degree graph coloring and the
//!   resulting register map.

pub mod graph_coloring_allocation;
pub mod interference_graph;
pub mod liveness_analysis;

pub use graph_coloring_allocation::{color_graph, ColoringError, Location, RegisterAllocMap, TieBreak};
pub use interference_graph::{InterfGraph, InterferenceError};
pub use liveness_analysis::{InstrId, Liveness, LivenessError};
