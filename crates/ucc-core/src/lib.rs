//! Core data model of the uC compiler: source coordinates, the type
//! system, the annotated AST, the uCIR instruction set and the
//! per-function control-flow graph arena.
//!
//! The pipeline crates (`ucc-parse`, `ucc-check`, `ucc-codegen`,
//! `ucc-opt`) all speak in terms of these types; none of them defines a
//! data representation of its own.

pub mod ast;
pub mod cfg;
pub mod coord;
pub mod ir;
pub mod types;

// Re-export commonly used types
pub use ast::{
    AssignOp, BinOp, Compound, Constant, Decl, Expr, ExprKind, ForInit, FuncDef, GlobalItem,
    Ident, Init, InitList, Param, Program, Stmt, TypeName, TypeSpec, UnOp,
};
pub use cfg::{Block, BlockId, BlockKind, CfgEdge, FunctionCfg};
pub use coord::Coord;
pub use ir::{format_code, format_instruction, BinAlu, GlobalInit, Instr, IrBase, IrType, LitValue};
pub use types::{ArrayType, UcType};
