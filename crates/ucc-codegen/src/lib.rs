//! uCIR generation for uC programs.
//!
//! [`generate`] lowers a semantically annotated AST into a [`ModuleIr`]:
//! the global section plus one control-flow graph per function. The
//! optimiser consumes the CFGs in place; [`ModuleIr::linear_code`] gives
//! the unoptimised three-address listing.

pub mod generator;

use serde::{Deserialize, Serialize};
use ucc_core::cfg::FunctionCfg;
use ucc_core::ir::{format_code, Instr};

pub use generator::{generate, CodeGenerator};

/// Generated IR for a whole translation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleIr {
    /// Global section: `global_*` instructions, including hoisted string
    /// literals and aggregate initializers.
    pub text: Vec<Instr>,
    /// One CFG per function definition, in source order.
    pub functions: Vec<FunctionCfg>,
}

impl ModuleIr {
    /// The linear instruction list: globals first, then each function's
    /// blocks in emission order.
    pub fn linear_code(&self) -> Vec<Instr> {
        let mut code = self.text.clone();
        for cfg in &self.functions {
            code.extend(cfg.linear_code());
        }
        code
    }

    /// Total instruction count of [`ModuleIr::linear_code`].
    pub fn instruction_count(&self) -> usize {
        self.text.len()
            + self
                .functions
                .iter()
                .map(|cfg| cfg.instruction_count())
                .sum::<usize>()
    }

    /// Renders the full listing.
    pub fn render(&self) -> String {
        format_code(&self.linear_code())
    }
}
