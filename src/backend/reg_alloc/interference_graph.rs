use log::debug;
use thiserror::Error;

use super::liveness_analysis::{InstrId, Liveness};
use crate::{
    collections::{Graph, GraphError},
    tac::{def_use, ControlFlowGraph, Ident},
};

#[derive(Debug, Error)]
pub enum InterferenceError {
    #[error("no liveness information for instruction {0:?}")]
    MissingLiveness(InstrId),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Undirected graph over TAC variables. Two variables are adjacent if they
/// may not share a register.
#[derive(Debug, Clone)]
pub struct InterfGraph {
    graph: Graph<Ident, ()>,
}

impl Default for InterfGraph {
    fn default() -> Self { Self::new() }
}

impl InterfGraph {
    pub fn new() -> Self {
        Self {
            graph: Graph::undirected(),
        }
    }

    pub fn add_vertex(&mut self, v: Ident) -> bool { self.graph.add_vertex(v, ()) }

    /// Add an interference edge. Self-loops and duplicates are ignored.
    pub fn add_edge(&mut self, u: &Ident, v: &Ident) -> Result<bool, GraphError> {
        self.graph.add_edge(u, v)
    }

    pub fn has_edge(&self, u: &Ident, v: &Ident) -> bool { self.graph.has_edge(u, v) }

    pub fn contains(&self, v: &Ident) -> bool { self.graph.has_vertex(v) }

    /// Vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &Ident> + '_ { self.graph.vertices() }

    pub fn position(&self, v: &Ident) -> Option<usize> { self.graph.position(v) }

    pub fn adjacent(&self, v: &Ident) -> impl Iterator<Item = &Ident> + '_ { self.graph.neighbors(v) }

    pub fn degree(&self, v: &Ident) -> usize { self.graph.degree(v) }

    pub fn edges(&self) -> impl Iterator<Item = (&Ident, &Ident)> + '_ { self.graph.edges() }

    pub fn len(&self) -> usize { self.graph.len() }

    pub fn is_empty(&self) -> bool { self.graph.is_empty() }

    pub fn edge_count(&self) -> usize { self.graph.edge_count() }

    pub fn to_mermaid(&self) -> String {
        let mut edges: Vec<(&str, &str)> = self
            .edges()
            .map(|(u, v)| {
                if u.name() <= v.name() {
                    (u.name(), v.name())
                } else {
                    (v.name(), u.name())
                }
            })
            .collect();
        edges.sort_unstable();

        let mut isolated: Vec<&str> = self
            .vertices()
            .filter(|v| self.degree(v) == 0)
            .map(Ident::name)
            .collect();
        isolated.sort_unstable();

        let mut s = String::from("graph LR;\n");
        for v in isolated {
            s.push_str(&format!("    {};\n", v));
        }
        for (u, v) in edges {
            s.push_str(&format!("    {} --- {};\n", u, v));
        }
        s
    }
}

/// Build the interference graph of a CFG from its liveness information.
///
/// Every defined or used variable becomes a vertex, in order of first
/// appearance. Each definition `d` interferes with every variable live after
/// the instruction, except that a copy `d = s` does not by itself make `d`
/// interfere with `s`.
pub fn build(cfg: &ControlFlowGraph, liveness: &Liveness) -> Result<InterfGraph, InterferenceError> {
    let mut graph = InterfGraph::new();

    for (_, instr) in cfg.instrs() {
        for v in def_use::defs(instr).into_iter().chain(def_use::uses(instr)) {
            graph.add_vertex(v.clone());
        }
    }

    for (id, instr) in cfg.instrs() {
        let defs = def_use::defs(instr);
        if defs.is_empty() {
            continue;
        }

        let after = liveness
            .after(id)
            .ok_or(InterferenceError::MissingLiveness(id))?;
        let copy_source = instr.copy_source();

        for d in &defs {
            for v in after {
                if defs.contains(&v) || copy_source == Some(v) {
                    continue;
                }
                graph.add_edge(d, v)?;
            }
        }
    }

    debug!(
        "interference graph: {} vertices, {} edges",
        graph.len(),
        graph.edge_count()
    );

    Ok(graph)
}
