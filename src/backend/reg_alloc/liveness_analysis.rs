use std::fmt::Write;

use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::tac::{def_use, BasicBlock, ControlFlowGraph, Ident};

/// `(block index, index within the block)`
pub type InstrId = (usize, usize);

#[derive(Debug, Error)]
pub enum LivenessError {
    /// The transfer function is monotone, so this only fires on a bug.
    #[error("liveness did not reach a fixpoint within {0} passes")]
    NoFixpoint(usize),
}

/// Live variables before and after every instruction.
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    pub before: FxHashMap<InstrId, FxHashSet<Ident>>,
    pub after: FxHashMap<InstrId, FxHashSet<Ident>>,
    pub live_in: FxHashMap<usize, FxHashSet<Ident>>,
    pub live_out: FxHashMap<usize, FxHashSet<Ident>>,
    /// Number of sweeps over the blocks until nothing changed.
    pub passes: usize,
}

impl Liveness {
    pub fn before(&self, id: InstrId) -> Option<&FxHashSet<Ident>> { self.before.get(&id) }

    pub fn after(&self, id: InstrId) -> Option<&FxHashSet<Ident>> { self.after.get(&id) }

    pub fn live_in(&self, block: usize) -> Option<&FxHashSet<Ident>> { self.live_in.get(&block) }

    pub fn live_out(&self, block: usize) -> Option<&FxHashSet<Ident>> { self.live_out.get(&block) }

    pub fn passes(&self) -> usize { self.passes }

    pub fn display(&self, cfg: &ControlFlowGraph) -> String {
        let mut s = String::new();

        for block in cfg.blocks() {
            let index = block.index();
            let _ = writeln!(
                s,
                "B{} in: {} out: {}",
                index,
                sorted(self.live_in(index)),
                sorted(self.live_out(index))
            );
            for (i, instr) in block.instrs().iter().enumerate() {
                let _ = writeln!(
                    s,
                    "    {:<24} before: {} after: {}",
                    instr.to_string(),
                    sorted(self.before((index, i))),
                    sorted(self.after((index, i)))
                );
            }
        }

        s
    }
}

fn sorted(set: Option<&FxHashSet<Ident>>) -> String {
    let mut names: Vec<&str> = set.into_iter().flatten().map(Ident::name).collect();
    names.sort_unstable();
    format!("{{{}}}", names.join(", "))
}

/// Compute the live variables at the start of `block`, given the variables
/// live at its end, recording the sets around each instruction.
fn live_start(
    block: &BasicBlock,
    live_out: &FxHashSet<Ident>,
    before: &mut FxHashMap<InstrId, FxHashSet<Ident>>,
    after: &mut FxHashMap<InstrId, FxHashSet<Ident>>,
) -> FxHashSet<Ident> {
    let mut live = live_out.clone();

    for (i, instr) in block.instrs().iter().enumerate().rev() {
        let id = (block.index(), i);
        after.insert(id, live.clone());

        // before = (after - def) U use
        for def in def_use::defs(instr) {
            live.remove(def);
        }
        live.extend(def_use::uses(instr).into_iter().cloned());

        before.insert(id, live.clone());
    }

    live
}

pub fn analyze(cfg: &ControlFlowGraph) -> Result<Liveness, LivenessError> { analyze_traced(cfg, |_| {}) }

/// [analyze], calling `on_pass` with the sets after every pass.
pub(crate) fn analyze_traced(
    cfg: &ControlFlowGraph,
    mut on_pass: impl FnMut(&Liveness),
) -> Result<Liveness, LivenessError> {
    let mut liveness = Liveness::default();

    let num_vars = cfg
        .instrs()
        .flat_map(|(_, instr)| def_use::defs(instr).into_iter().chain(def_use::uses(instr)))
        .collect::<FxHashSet<_>>()
        .len();
    // every pass but the last grows some live-in set by at least one variable
    let max_passes = cfg.len() * num_vars + 2;

    for block in cfg.blocks() {
        liveness.live_in.insert(block.index(), FxHashSet::default());
    }
    let mut dirty = vec![true; cfg.len()];

    debug!(
        "liveness: {} blocks, {} variables",
        cfg.len(),
        num_vars
    );

    while dirty.iter().any(|d| *d) {
        if liveness.passes == max_passes {
            return Err(LivenessError::NoFixpoint(max_passes));
        }
        liveness.passes += 1;

        for index in (0..cfg.len()).rev() {
            let Some(block) = cfg.block(index) else {
                continue;
            };

            // out[B] = U in[S] for all S in succ[B]
            let mut out: FxHashSet<Ident> = FxHashSet::default();
            for succ in cfg.succs(index) {
                if let Some(succ_in) = liveness.live_in.get(&succ) {
                    out.extend(succ_in.iter().cloned());
                }
            }

            let in_ = live_start(block, &out, &mut liveness.before, &mut liveness.after);
            liveness.live_out.insert(index, out);

            if liveness.live_in.get(&index) != Some(&in_) {
                liveness.live_in.insert(index, in_);
                dirty[index] = true;
            } else {
                dirty[index] = false;
            }
        }

        trace!("liveness: pass {} done", liveness.passes);
        on_pass(&liveness);
    }

    debug!("liveness: fixpoint after {} passes", liveness.passes);

    Ok(liveness)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tac::frontend;

    const NESTED_LOOPS: &str = "i = 0
s = 0
outer:
c = i < 4
if c goto outer_body
goto done
outer_body:
j = 0
inner:
d = j < i
if d goto inner_body
goto outer_next
inner_body:
s = s + j
j = j + 1
goto inner
outer_next:
i = i + 1
goto outer
done:
print(s)";

    fn nested_loops() -> ControlFlowGraph {
        ControlFlowGraph::from_instrs(frontend::parse(NESTED_LOOPS).unwrap()).unwrap()
    }

    #[test]
    fn test_sets_only_grow_across_passes() {
        let cfg = nested_loops();
        let mut history: Vec<Liveness> = Vec::new();
        let liveness = analyze_traced(&cfg, |pass| history.push(pass.clone())).unwrap();

        assert_eq!(history.len(), liveness.passes());
        assert!(history.len() > 2);

        for (prev, next) in history.iter().zip(history.iter().skip(1)) {
            for block in cfg.blocks() {
                let index = block.index();
                for (label, prev_set, next_set) in [
                    ("in", prev.live_in(index), next.live_in(index)),
                    ("out", prev.live_out(index), next.live_out(index)),
                ] {
                    let prev_set = prev_set.cloned().unwrap_or_default();
                    let next_set = next_set.cloned().unwrap_or_default();
                    assert!(
                        prev_set.is_subset(&next_set),
                        "B{} {} shrank after pass {}",
                        index,
                        label,
                        prev.passes()
                    );
                }
            }
        }

        // the last pass changed nothing
        let (last, before_last) = (&history[history.len() - 1], &history[history.len() - 2]);
        assert_eq!(last.live_in, before_last.live_in);
        assert_eq!(last.live_out, before_last.live_out);
    }

    #[test]
    fn test_converged_sets_are_stable() {
        let cfg = nested_loops();
        let liveness = analyze(&cfg).unwrap();

        for block in cfg.blocks() {
            let index = block.index();

            let mut out: FxHashSet<Ident> = FxHashSet::default();
            for succ in cfg.succs(index) {
                out.extend(liveness.live_in(succ).into_iter().flatten().cloned());
            }
            assert_eq!(liveness.live_out(index), Some(&out));

            let mut before = FxHashMap::default();
            let mut after = FxHashMap::default();
            let in_ = live_start(block, &out, &mut before, &mut after);
            assert_eq!(liveness.live_in(index), Some(&in_));
            for (id, set) in &before {
                assert_eq!(liveness.before(*id), Some(set));
            }
            for (id, set) in &after {
                assert_eq!(liveness.after(*id), Some(set));
            }
        }
    }
}
