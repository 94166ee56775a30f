//! # Graph
//!
//! A small adjacency-set graph with a payload attached to every vertex. The
//! same structure backs the control flow graph (directed, blocks as payload)
//! and the interference graph (undirected, no payload).
//!
//! Vertices are stored in insertion order and neighbor sets are kept as
//! ordered index sets, so every iteration over a graph is deterministic.

use std::{collections::BTreeSet, fmt, hash::Hash};

use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    Directed,
    Undirected,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("edge endpoint is not a vertex of the graph: {0}")]
    MissingVertex(String),
}

#[derive(Debug, Clone)]
pub struct Graph<V, D> {
    kind: GraphKind,
    /// Vertices in insertion order.
    vertices: Vec<V>,
    /// Payload of each vertex, indexed like `vertices`.
    payloads: Vec<D>,
    /// Mapping from vertex to its insertion index.
    index: FxHashMap<V, usize>,
    /// Outgoing edges. For undirected graphs this is the neighbor set.
    succs: Vec<BTreeSet<usize>>,
    /// Incoming edges. Unused (kept equal to `succs`) for undirected graphs.
    preds: Vec<BTreeSet<usize>>,
    edge_count: usize,
}

impl<V, D> Graph<V, D>
where
    V: Clone + Hash + Eq + fmt::Debug,
{
    pub fn new(kind: GraphKind) -> Self {
        Self {
            kind,
            vertices: Vec::new(),
            payloads: Vec::new(),
            index: FxHashMap::default(),
            succs: Vec::new(),
            preds: Vec::new(),
            edge_count: 0,
        }
    }

    pub fn directed() -> Self { Self::new(GraphKind::Directed) }

    pub fn undirected() -> Self { Self::new(GraphKind::Undirected) }

    pub fn kind(&self) -> GraphKind { self.kind }

    pub fn len(&self) -> usize { self.vertices.len() }

    pub fn is_empty(&self) -> bool { self.vertices.is_empty() }

    pub fn edge_count(&self) -> usize { self.edge_count }

    /// Add a vertex with its payload.
    ///
    /// Returns false and leaves the graph untouched if the vertex already
    /// exists.
    pub fn add_vertex(&mut self, v: V, data: D) -> bool {
        if self.index.contains_key(&v) {
            return false;
        }
        self.index.insert(v.clone(), self.vertices.len());
        self.vertices.push(v);
        self.payloads.push(data);
        self.succs.push(BTreeSet::new());
        self.preds.push(BTreeSet::new());
        true
    }

    /// Add an edge between two existing vertices.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: the edge is new.
    /// - `Ok(false)`: the edge already exists, or it is a self-loop in an
    ///   undirected graph (those are never stored).
    /// - `Err(_)`: one of the endpoints is not in the graph.
    pub fn add_edge(&mut self, from: &V, to: &V) -> Result<bool, GraphError> {
        let a = self.index_of(from)?;
        let b = self.index_of(to)?;

        match self.kind {
            GraphKind::Directed => {
                if !self.succs[a].insert(b) {
                    return Ok(false);
                }
                self.preds[b].insert(a);
            }
            GraphKind::Undirected => {
                if a == b || !self.succs[a].insert(b) {
                    return Ok(false);
                }
                self.succs[b].insert(a);
            }
        }

        self.edge_count += 1;
        Ok(true)
    }

    pub fn has_vertex(&self, v: &V) -> bool { self.index.contains_key(v) }

    pub fn has_edge(&self, from: &V, to: &V) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(a), Some(b)) => self.succs[*a].contains(b),
            _ => false,
        }
    }

    pub fn payload(&self, v: &V) -> Option<&D> { self.index.get(v).map(|i| &self.payloads[*i]) }

    /// Iterate over the vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = &V> + '_ { self.vertices.iter() }

    /// Iterate over `(vertex, payload)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&V, &D)> + '_ {
        self.vertices.iter().zip(self.payloads.iter())
    }

    /// The insertion index of a vertex.
    pub fn position(&self, v: &V) -> Option<usize> { self.index.get(v).copied() }

    /// Successors of a vertex, or neighbors in an undirected graph.
    ///
    /// An unknown vertex has no successors.
    pub fn succs(&self, v: &V) -> impl Iterator<Item = &V> + '_ {
        self.adjacent(&self.succs, v)
    }

    /// Predecessors of a vertex. Same as [Graph::succs] for undirected graphs.
    pub fn preds(&self, v: &V) -> impl Iterator<Item = &V> + '_ {
        match self.kind {
            GraphKind::Directed => self.adjacent(&self.preds, v),
            GraphKind::Undirected => self.adjacent(&self.succs, v),
        }
    }

    pub fn neighbors(&self, v: &V) -> impl Iterator<Item = &V> + '_ { self.succs(v) }

    pub fn degree(&self, v: &V) -> usize { self.index.get(v).map_or(0, |i| self.succs[*i].len()) }

    /// Iterate over all edges once, in vertex order.
    ///
    /// Undirected edges are reported with the earlier-inserted vertex first.
    pub fn edges(&self) -> impl Iterator<Item = (&V, &V)> + '_ {
        let undirected = self.kind == GraphKind::Undirected;
        self.succs.iter().enumerate().flat_map(move |(a, succs)| {
            succs
                .iter()
                .filter(move |b| !undirected || a < **b)
                .map(move |b| (&self.vertices[a], &self.vertices[*b]))
        })
    }

    fn index_of(&self, v: &V) -> Result<usize, GraphError> {
        self.index
            .get(v)
            .copied()
            .ok_or_else(|| GraphError::MissingVertex(format!("{:?}", v)))
    }

    fn adjacent<'a>(
        &'a self,
        adj: &'a [BTreeSet<usize>],
        v: &V,
    ) -> impl Iterator<Item = &'a V> + 'a {
        self.index
            .get(v)
            .map(|i| &adj[*i])
            .into_iter()
            .flatten()
            .map(move |j| &self.vertices[*j])
    }
}
