use std::fmt;

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::interference_graph::InterfGraph;
use crate::{collections::PrioQueue, tac::Ident};

/// How to order vertices whose forbidden sets have the same size.
#[derive(Debug, Clone, Default)]
pub enum TieBreak {
    /// First appearance in the interference graph.
    #[default]
    Insertion,
    /// Variable name order.
    Lexical,
    /// Caller-supplied ranks, smaller first. Must rank every vertex.
    Explicit(FxHashMap<Ident, usize>),
}

#[derive(Debug, Error)]
pub enum ColoringError {
    #[error("tie-break order does not rank variable `{0}`")]
    IncompleteOrder(Ident),
}

/// Where a variable lives after allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    /// Index into the target's allocatable registers.
    Register(usize),
    /// Spill slot index.
    Spill(usize),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Register(index) => write!(f, "reg {}", index),
            Location::Spill(slot) => write!(f, "spill {}", slot),
        }
    }
}

/// The final variable to register-or-spill-slot mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterAllocMap {
    colors: FxHashMap<Ident, usize>,
    max_regs: usize,
}

impl RegisterAllocMap {
    pub fn new(colors: FxHashMap<Ident, usize>, max_regs: usize) -> Self { Self { colors, max_regs } }

    pub fn max_regs(&self) -> usize { self.max_regs }

    pub fn len(&self) -> usize { self.colors.len() }

    pub fn is_empty(&self) -> bool { self.colors.is_empty() }

    pub fn color(&self, v: &Ident) -> Option<usize> { self.colors.get(v).copied() }

    /// Colors below the budget are registers, the rest are spill slots
    /// numbered from zero.
    pub fn location(&self, v: &Ident) -> Option<Location> {
        self.color(v).map(|color| {
            if color < self.max_regs {
                Location::Register(color)
            } else {
                Location::Spill(color - self.max_regs)
            }
        })
    }

    /// Number of distinct registers in use.
    pub fn registers_used(&self) -> usize {
        self.colors
            .values()
            .filter(|c| **c < self.max_regs)
            .collect::<FxHashSet<_>>()
            .len()
    }

    /// Number of spill slots a frame must reserve.
    pub fn spill_slots(&self) -> usize {
        self.colors
            .values()
            .filter(|c| **c >= self.max_regs)
            .map(|c| c - self.max_regs + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn spilled(&self) -> impl Iterator<Item = &Ident> + '_ {
        self.colors
            .iter()
            .filter(|(_, c)| **c >= self.max_regs)
            .map(|(v, _)| v)
    }

    /// All entries, sorted by variable name.
    pub fn iter(&self) -> Vec<(&Ident, Location)> {
        let mut entries: Vec<(&Ident, Location)> = self
            .colors
            .keys()
            .filter_map(|v| self.location(v).map(|loc| (v, loc)))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl fmt::Display for RegisterAllocMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "max_regs: {}", self.max_regs)?;
        for (v, loc) in self.iter() {
            writeln!(f, "{}: {}", v, loc)?;
        }
        Ok(())
    }
}

/// Smallest color not in the forbidden set.
fn choose_color(forbidden: Option<&FxHashSet<usize>>) -> usize {
    let Some(forbidden) = forbidden else {
        return 0;
    };
    (0..).find(|c| !forbidden.contains(c)).unwrap_or(0)
}

fn ranks(graph: &InterfGraph, order: &TieBreak) -> Result<FxHashMap<Ident, usize>, ColoringError> {
    match order {
        TieBreak::Insertion => Ok(graph
            .vertices()
            .enumerate()
            .map(|(i, v)| (v.clone(), i))
            .collect()),
        TieBreak::Lexical => {
            let mut vertices: Vec<&Ident> = graph.vertices().collect();
            vertices.sort_unstable();
            Ok(vertices
                .into_iter()
                .enumerate()
                .map(|(i, v)| (v.clone(), i))
                .collect())
        }
        TieBreak::Explicit(ranks) => graph
            .vertices()
            .map(|v| {
                ranks
                    .get(v)
                    .map(|rank| (v.clone(), *rank))
                    .ok_or_else(|| ColoringError::IncompleteOrder(v.clone()))
            })
            .collect(),
    }
}

/// Color the interference graph, saturation degree first.
///
/// The uncolored vertex with the most distinct colors among its colored
/// neighbors is colored next, with the smallest color none of them uses.
/// Colors at or above `max_regs` become spill slots, so this never fails for
/// lack of registers.
pub fn color_graph(
    graph: &InterfGraph,
    max_regs: usize,
    order: &TieBreak,
) -> Result<RegisterAllocMap, ColoringError> {
    let ranks = ranks(graph, order)?;

    let mut queue = PrioQueue::new();
    for v in graph.vertices() {
        queue.push(v.clone(), 0, ranks.get(v).copied().unwrap_or(usize::MAX));
    }

    let mut forbidden: FxHashMap<Ident, FxHashSet<usize>> = FxHashMap::default();
    let mut colors: FxHashMap<Ident, usize> = FxHashMap::default();

    while let Some((u, saturation)) = queue.pop() {
        let color = choose_color(forbidden.get(&u));
        trace!("coloring {} with {} (saturation {})", u, color, saturation);

        for n in graph.adjacent(&u) {
            if colors.contains_key(n) {
                continue;
            }
            // priority tracks the forbidden-set size
            if forbidden.entry(n.clone()).or_default().insert(color) {
                queue.increase(n, 1);
            }
        }

        colors.insert(u, color);
    }

    let map = RegisterAllocMap::new(colors, max_regs);
    debug!(
        "coloring: {} variables, {} registers, {} spill slots",
        map.len(),
        map.registers_used(),
        map.spill_slots()
    );

    Ok(map)
}
