//! Global instruction numbering and the per-function definition map.
//!
//! Indices start at 1 and grow monotonically across the blocks in
//! emission order; block `start_index` plus the instruction's offset
//! recovers the global index, so no per-instruction storage is needed.
//!
//! The definition map records, for every written name, the ordered list
//! of indices that write it. `define` contributes one definition per
//! parameter temporary at the header's index.

use indexmap::IndexMap;
use ucc_core::cfg::FunctionCfg;
use ucc_core::ir::Instr;

/// Result of the numbering pass.
#[derive(Debug, Clone)]
pub struct Numbering {
    /// name -> ordered indices of the instructions defining it.
    pub defs: IndexMap<String, Vec<u32>>,
    /// Total number of instructions in the function.
    pub count: u32,
}

/// Assigns global indices (via `Block::start_index`) and builds the
/// definition map.
pub fn number_instructions(cfg: &mut FunctionCfg) -> Numbering {
    let mut defs: IndexMap<String, Vec<u32>> = IndexMap::new();
    let mut index = 1u32;

    for id in cfg.order().to_vec() {
        let block = cfg.block_mut(id);
        block.start_index = index;
        for instr in &block.instructions {
            match instr {
                Instr::Define { params, .. } => {
                    for (_, temp) in params {
                        defs.entry(temp.clone()).or_default().push(index);
                    }
                }
                _ => {
                    if let Some(target) = instr.defined_target() {
                        defs.entry(target.to_string()).or_default().push(index);
                    }
                }
            }
            index += 1;
        }
    }

    Numbering {
        defs,
        count: index - 1,
    }
}

/// The instruction at a global index, if it exists.
pub fn instr_at(cfg: &FunctionCfg, index: u32) -> Option<&Instr> {
    for id in cfg.order() {
        let block = cfg.block(*id);
        let len = block.instructions.len() as u32;
        if index >= block.start_index && index < block.start_index + len {
            return block.instructions.get((index - block.start_index) as usize);
        }
    }
    None
}

/// gen/kill contribution of one instruction: a defining instruction
/// generates its own index and kills every other definition of the names
/// it writes.
pub fn instruction_gen_kill(
    instr: &Instr,
    index: u32,
    defs: &IndexMap<String, Vec<u32>>,
) -> (Vec<u32>, Vec<u32>) {
    let mut targets: Vec<&str> = Vec::new();
    match instr {
        Instr::Define { params, .. } => {
            for (_, temp) in params {
                targets.push(temp);
            }
        }
        _ => {
            if let Some(target) = instr.defined_target() {
                targets.push(target);
            }
        }
    }
    if targets.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let gen = vec![index];
    let mut kill = Vec::new();
    for target in targets {
        if let Some(indices) = defs.get(target) {
            kill.extend(indices.iter().copied().filter(|i| *i != index));
        }
    }
    (gen, kill)
}
