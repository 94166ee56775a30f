//! # Collection of Basic Data Structures
//!
//! This module contains the following submodules:
//!
//! - `graph`: Directed/undirected graph with per-vertex payload, used for the
//!   control flow graph and the interference graph.
//! - `prio_queue`: Indexed max-heap with in-place priority increase.

pub mod graph;
pub mod prio_queue;

pub use graph::{Graph, GraphError, GraphKind};
pub use prio_queue::PrioQueue;
