//! Reaching definitions (forward, union) and constant propagation.
//!
//! Block-level gen/kill sets compose the per-instruction contributions
//! left to right; the solver is a FIFO worklist that re-enqueues the
//! successors of any block whose `out` set changed. Termination follows
//! from monotone growth bounded by the instruction count.
//!
//! Constant propagation is a single pass over the converged `in` sets:
//! a `load %x %t` is rewritten to `literal v %t` only when every
//! definition of `x` reaching that point is a store of a source that
//! itself resolves to the single literal `v` (all occurrences equal).
//! Module globals (`@` names) are never propagated. Folding a binary
//! operation whose operands both resolve to literals is performed under
//! the same reaching-definition discipline, so a computation chain of
//! constants collapses within the pass.

use std::collections::{BTreeSet, VecDeque};

use ucc_core::cfg::{BlockId, FunctionCfg};
use ucc_core::ir::{BinAlu, Instr, IrBase, IrType, LitValue};

use crate::numbering::{instr_at, instruction_gen_kill, Numbering};

/// Composes block-level `gen_defs` / `kill_defs` from the instruction
/// contributions.
pub fn compute_gen_kill(cfg: &mut FunctionCfg, numbering: &Numbering) {
    for id in cfg.order().to_vec() {
        let block = cfg.block_mut(id);
        let mut gen: Vec<u32> = Vec::new();
        let mut kill: Vec<u32> = Vec::new();
        for (offset, instr) in block.instructions.iter().enumerate() {
            let index = block.start_index + offset as u32;
            let (inst_gen, inst_kill) = instruction_gen_kill(instr, index, &numbering.defs);
            if inst_gen.is_empty() && inst_kill.is_empty() {
                continue;
            }
            gen.retain(|i| !inst_kill.contains(i));
            gen.extend(inst_gen);
            kill.extend(inst_kill);
        }
        block.gen_defs = gen.into_iter().collect();
        block.kill_defs = kill.into_iter().collect();
    }
}

/// Solves `in`/`out` to fixpoint with a FIFO worklist.
pub fn solve(cfg: &mut FunctionCfg) {
    let mut worklist: VecDeque<BlockId> = cfg.order().iter().copied().collect();

    while let Some(id) = worklist.pop_front() {
        let mut rd_in = cfg.block(id).rd_in.clone();
        for pred in cfg.predecessors(id) {
            rd_in.extend(cfg.block(pred).rd_out.iter().copied());
        }

        let block = cfg.block(id);
        let mut rd_out: BTreeSet<u32> =
            rd_in.difference(&block.kill_defs).copied().collect();
        rd_out.extend(block.gen_defs.iter().copied());

        let changed = rd_out != block.rd_out;
        let block = cfg.block_mut(id);
        block.rd_in = rd_in;
        block.rd_out = rd_out;

        if changed {
            for succ in cfg.successors(id) {
                worklist.push_back(succ);
            }
        }
    }
}

/// Rewrites constant loads (and foldable binary operations) in place,
/// maintaining the running reaching set instruction by instruction.
/// The converged `in` sets are not re-derived after a rewrite.
pub fn constant_propagation(cfg: &mut FunctionCfg, numbering: &Numbering) {
    for id in cfg.order().to_vec() {
        let mut current = cfg.block(id).rd_in.clone();
        let len = cfg.block(id).instructions.len();

        for offset in 0..len {
            let index = cfg.block(id).start_index + offset as u32;
            let instr = cfg.block(id).instructions[offset].clone();

            let replacement = match &instr {
                Instr::Load { src, target, .. } => {
                    propagated_load(cfg, numbering, &current, src).map(|(ty, value)| {
                        Instr::Literal {
                            ty,
                            value,
                            target: target.clone(),
                        }
                    })
                }
                Instr::Binary {
                    op,
                    ty,
                    left,
                    right,
                    target,
                } => fold_binary(cfg, numbering, &current, *op, ty, left, right).map(|value| {
                    Instr::Literal {
                        ty: ty.clone(),
                        value,
                        target: target.clone(),
                    }
                }),
                _ => None,
            };

            if let Some(replacement) = replacement {
                cfg.block_mut(id).instructions[offset] = replacement;
            }

            let effective = &cfg.block(id).instructions[offset];
            let (inst_gen, inst_kill) = instruction_gen_kill(effective, index, &numbering.defs);
            if !inst_gen.is_empty() || !inst_kill.is_empty() {
                for killed in inst_kill {
                    current.remove(&killed);
                }
                current.extend(inst_gen);
            }
        }
    }
}

/// The literal value of a constant load of `variable`, if every reaching
/// definition is a store of the same literal.
fn propagated_load(
    cfg: &FunctionCfg,
    numbering: &Numbering,
    current: &BTreeSet<u32>,
    variable: &str,
) -> Option<(IrType, LitValue)> {
    if variable.starts_with('@') {
        return None;
    }
    let var_defs = numbering.defs.get(variable)?;

    let mut result: Option<(IrType, LitValue)> = None;
    for index in current {
        if !var_defs.contains(index) {
            continue;
        }
        let Some(Instr::Store { src, .. }) = instr_at(cfg, *index) else {
            return None;
        };
        let (ty, value) = resolve_literal(cfg, numbering, current, src)?;
        match &result {
            None => result = Some((ty, value)),
            Some((_, seen)) if *seen == value => {}
            _ => return None,
        }
    }
    result
}

/// The single literal value a name carries at this point, if all its
/// reaching definitions are equal literals.
fn resolve_literal(
    cfg: &FunctionCfg,
    numbering: &Numbering,
    current: &BTreeSet<u32>,
    name: &str,
) -> Option<(IrType, LitValue)> {
    if name.starts_with('@') {
        return None;
    }
    let defs = numbering.defs.get(name)?;

    let mut result: Option<(IrType, LitValue)> = None;
    for index in current {
        if !defs.contains(index) {
            continue;
        }
        let Some(Instr::Literal { ty, value, .. }) = instr_at(cfg, *index) else {
            return None;
        };
        match &result {
            None => result = Some((ty.clone(), value.clone())),
            Some((_, seen)) if seen == value => {}
            _ => return None,
        }
    }
    result
}

/// Evaluates a binary operation over literal operands. Overflow, division
/// by zero and non-arithmetic operand shapes leave the instruction alone.
fn fold_binary(
    cfg: &FunctionCfg,
    numbering: &Numbering,
    current: &BTreeSet<u32>,
    op: BinAlu,
    ty: &IrType,
    left: &str,
    right: &str,
) -> Option<LitValue> {
    if !ty.dims.is_empty() || ty.indirect {
        return None;
    }
    let (_, lhs) = resolve_literal(cfg, numbering, current, left)?;
    let (_, rhs) = resolve_literal(cfg, numbering, current, right)?;

    match (ty.base, lhs, rhs) {
        (IrBase::Int, LitValue::Int(a), LitValue::Int(b)) => {
            let value = match op {
                BinAlu::Add => a.checked_add(b)?,
                BinAlu::Sub => a.checked_sub(b)?,
                BinAlu::Mul => a.checked_mul(b)?,
                BinAlu::Div => a.checked_div(b)?,
                BinAlu::Mod => a.checked_rem(b)?,
                _ => return None,
            };
            Some(LitValue::Int(value))
        }
        (IrBase::Float, LitValue::Float(a), LitValue::Float(b)) => {
            let value = match op {
                BinAlu::Add => a + b,
                BinAlu::Sub => a - b,
                BinAlu::Mul => a * b,
                BinAlu::Div => a / b,
                _ => return None,
            };
            Some(LitValue::Float(value))
        }
        _ => None,
    }
}
