//! Live variables (backward, union) and dead-code elimination.
//!
//! Block-level `used`/`defined` name sets keep first-occurrence order
//! (they are `IndexSet`s); the solver is a LIFO worklist seeded with
//! every block, recomputing `out` from the successors' `in` and then
//! `in = used ∪ (out \ defined)`, re-enqueueing predecessors on change.
//! The exit block's `out` is the set of module-global names, which keeps
//! stores to globals alive.
//!
//! An instruction is dead when it is one of the removable opcodes
//! (`store`, `literal`, `load`, `call`, binary ops) and its target is in
//! neither the block's `out` set nor the block's `used` set. Everything
//! side-effecting survives unconditionally.

use std::collections::BTreeSet;

use indexmap::IndexSet;
use ucc_core::cfg::{BlockId, BlockKind, CfgEdge, FunctionCfg};

/// Collects per-block `used`/`defined` sets in one walk.
pub fn compute_use_def(cfg: &mut FunctionCfg) {
    for id in cfg.order().to_vec() {
        let block = cfg.block_mut(id);
        let mut used: IndexSet<String> = IndexSet::new();
        let mut defined: IndexSet<String> = IndexSet::new();
        for instr in &block.instructions {
            for name in instr.uses() {
                used.insert(name.to_string());
            }
            if let Some(target) = instr.defined_target() {
                defined.insert(target.to_string());
            }
        }
        block.used = used;
        block.defined = defined;
    }
}

/// Solves `in`/`out` to fixpoint with a LIFO worklist.
pub fn solve(cfg: &mut FunctionCfg, global_names: &[String]) {
    let mut worklist: Vec<BlockId> = cfg.order().to_vec();

    while let Some(id) = worklist.pop() {
        let new_out: IndexSet<String> = if id == cfg.exit() {
            global_names.iter().cloned().collect()
        } else {
            match cfg.block(id).kind {
                BlockKind::Basic => cfg
                    .successor(id, CfgEdge::Branch)
                    .map(|succ| cfg.block(succ).live_in.clone())
                    .unwrap_or_default(),
                BlockKind::Condition => {
                    let mut out = cfg
                        .successor(id, CfgEdge::Taken)
                        .map(|succ| cfg.block(succ).live_in.clone())
                        .unwrap_or_default();
                    if let Some(succ) = cfg.successor(id, CfgEdge::FallThrough) {
                        out.extend(cfg.block(succ).live_in.iter().cloned());
                    }
                    out
                }
            }
        };

        let block = cfg.block(id);
        let mut new_in = block.used.clone();
        for name in &new_out {
            if !block.defined.contains(name) {
                new_in.insert(name.clone());
            }
        }

        let changed = new_in != block.live_in || new_out != block.live_out;
        let block = cfg.block_mut(id);
        block.live_in = new_in;
        block.live_out = new_out;

        if changed {
            for pred in cfg.predecessors(id) {
                worklist.push(pred);
            }
        }
    }
}

/// Indices of the instructions dead-code elimination removes.
pub fn dead_code(cfg: &FunctionCfg) -> BTreeSet<u32> {
    let mut dead = BTreeSet::new();
    for id in cfg.order() {
        let block = cfg.block(*id);
        for (offset, instr) in block.instructions.iter().enumerate() {
            if !instr.is_removable() {
                continue;
            }
            let target = instr
                .defined_target()
                .expect("removable instructions define a target");
            if !block.live_out.contains(target) && !block.used.contains(target) {
                dead.insert(block.start_index + offset as u32);
            }
        }
    }
    dead
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucc_core::ir::{Instr, IrBase, IrType, LitValue};

    fn int() -> IrType {
        IrType::scalar(IrBase::Int)
    }

    /// entry: literal -> store %x, store %y (dead); exit returns via slot.
    fn cfg_with_dead_store() -> FunctionCfg {
        let mut cfg = FunctionCfg::new("f");
        let entry = cfg.entry();
        for instr in [
            Instr::Entry,
            Instr::Literal {
                ty: int(),
                value: LitValue::Int(7),
                target: "%1".into(),
            },
            Instr::Store {
                ty: int(),
                src: "%1".into(),
                target: "%x".into(),
            },
            Instr::Literal {
                ty: int(),
                value: LitValue::Int(10),
                target: "%2".into(),
            },
            Instr::Store {
                ty: int(),
                src: "%2".into(),
                target: "%y".into(),
            },
            Instr::Load {
                ty: int(),
                src: "%x".into(),
                target: "%3".into(),
            },
            Instr::Store {
                ty: int(),
                src: "%3".into(),
                target: "%ret".into(),
            },
            Instr::Jump {
                target: "%exit".into(),
            },
        ] {
            cfg.block_mut(entry).append(instr);
        }
        let exit = cfg.exit();
        cfg.block_mut(exit).append(Instr::Label("exit".into()));
        cfg.block_mut(exit).append(Instr::Return {
            ty: int(),
            value: Some("%ret".into()),
        });
        cfg.add_edge(entry, exit, CfgEdge::Branch);
        cfg.seal();
        cfg
    }

    #[test]
    fn use_def_sets_keep_first_occurrence_order() {
        let mut cfg = cfg_with_dead_store();
        compute_use_def(&mut cfg);
        let entry = cfg.entry();
        let used: Vec<&str> = cfg.block(entry).used.iter().map(|s| s.as_str()).collect();
        assert_eq!(used, vec!["%1", "%2", "%x", "%3"]);
        let defined: Vec<&str> = cfg
            .block(entry)
            .defined
            .iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(defined, vec!["%1", "%x", "%2", "%y", "%3", "%ret"]);
    }

    #[test]
    fn exit_out_is_the_global_name_set() {
        let mut cfg = cfg_with_dead_store();
        compute_use_def(&mut cfg);
        solve(&mut cfg, &["@g".to_string()]);
        let exit = cfg.exit();
        assert!(cfg.block(exit).live_out.contains("@g"));
        // %ret is read by the return, so it is live into the exit block
        // and out of the entry block.
        assert!(cfg.block(exit).live_in.contains("%ret"));
        assert!(cfg.block(cfg.entry()).live_out.contains("%ret"));
    }

    #[test]
    fn dead_store_is_marked_but_used_names_survive() {
        let mut cfg = cfg_with_dead_store();
        // Numbering is only start_index assignment here.
        crate::numbering::number_instructions(&mut cfg);
        compute_use_def(&mut cfg);
        solve(&mut cfg, &[]);
        let dead = dead_code(&cfg);
        // Only the store to %y (index 5) is dead: %y is never read, while
        // %1/%2/%3 all appear in the entry block's used set.
        assert_eq!(dead.into_iter().collect::<Vec<u32>>(), vec![5]);
    }

    #[test]
    fn side_effecting_instructions_are_never_dead() {
        let mut cfg = FunctionCfg::new("f");
        let entry = cfg.entry();
        cfg.block_mut(entry).append(Instr::Entry);
        cfg.block_mut(entry).append(Instr::Print {
            ty: int(),
            src: "%1".into(),
        });
        cfg.block_mut(entry).append(Instr::Jump {
            target: "%exit".into(),
        });
        let exit = cfg.exit();
        cfg.block_mut(exit).append(Instr::Label("exit".into()));
        cfg.block_mut(exit).append(Instr::Return {
            ty: IrType::scalar(IrBase::Void),
            value: None,
        });
        cfg.add_edge(entry, exit, CfgEdge::Branch);
        cfg.seal();

        crate::numbering::number_instructions(&mut cfg);
        compute_use_def(&mut cfg);
        solve(&mut cfg, &[]);
        assert!(dead_code(&cfg).is_empty());
    }
}
