//! Dataflow optimisation over generated uCIR.
//!
//! For every function CFG the pipeline runs, in order: instruction
//! numbering and def-map construction, reaching definitions (gen/kill,
//! worklist fixpoint), constant propagation, live variables (use/def,
//! worklist fixpoint, with module globals live out of the exit block) and
//! dead-code elimination. Three CFG simplification passes are declared in
//! the pipeline but intentionally left as no-ops.
//!
//! [`optimize`] returns the final linear instruction list: the global
//! section followed, per function, by the surviving numbered
//! instructions in emission order.

pub mod liveness;
pub mod numbering;
pub mod reaching;

use tracing::debug;
use ucc_codegen::ModuleIr;
use ucc_core::cfg::FunctionCfg;
use ucc_core::ir::Instr;

pub use numbering::{instr_at, number_instructions, Numbering};

/// Result of optimising a module: the surviving linear IR plus the
/// instruction counts the speedup report is computed from.
#[derive(Debug, Clone)]
pub struct OptimizedIr {
    pub code: Vec<Instr>,
    pub default_len: usize,
    pub optimized_len: usize,
}

impl OptimizedIr {
    /// `default / optimized`, the ratio reported as `[SPEEDUP]`.
    pub fn speedup(&self) -> f64 {
        self.default_len as f64 / self.optimized_len as f64
    }

    pub fn render(&self) -> String {
        ucc_core::ir::format_code(&self.code)
    }
}

/// Runs the full dataflow pipeline over `module`, mutating its CFGs
/// (numbering, dataflow sets, propagated constants) in place.
pub fn optimize(module: &mut ModuleIr) -> OptimizedIr {
    let default_len = module.instruction_count();

    let global_names: Vec<String> = module
        .text
        .iter()
        .filter_map(|instr| match instr {
            Instr::Global { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect();

    let mut code: Vec<Instr> = module.text.clone();
    for cfg in &mut module.functions {
        let numbering = number_instructions(cfg);

        reaching::compute_gen_kill(cfg, &numbering);
        reaching::solve(cfg);
        reaching::constant_propagation(cfg, &numbering);

        liveness::compute_use_def(cfg);
        liveness::solve(cfg, &global_names);
        let dead = liveness::dead_code(cfg);

        short_circuit_jumps(cfg);
        merge_blocks(cfg);
        discard_unused_allocs(cfg);

        for id in cfg.order().to_vec() {
            let block = cfg.block(id);
            for (offset, instr) in block.instructions.iter().enumerate() {
                let index = block.start_index + offset as u32;
                if !dead.contains(&index) {
                    code.push(instr.clone());
                }
            }
        }
        debug!(
            function = cfg.name(),
            instructions = numbering.count,
            removed = dead.len(),
            "dataflow optimisation completed"
        );
    }

    let optimized_len = code.len();
    OptimizedIr {
        code,
        default_len,
        optimized_len,
    }
}

/// Threads jumps whose target block is a single jump. Declared in the
/// pipeline but intentionally a no-op.
fn short_circuit_jumps(_cfg: &mut FunctionCfg) {}

/// Merges single-predecessor blocks into their predecessor. Declared in
/// the pipeline but intentionally a no-op.
fn merge_blocks(_cfg: &mut FunctionCfg) {}

/// Drops `alloc_*` instructions whose slot is never referenced. Declared
/// in the pipeline but intentionally a no-op.
fn discard_unused_allocs(_cfg: &mut FunctionCfg) {}
