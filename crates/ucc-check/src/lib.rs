//! Semantic analysis for uC.
//!
//! [`analyze`] walks a parsed [`Program`](ucc_core::ast::Program),
//! resolving names against a scoped [`SymbolTable`], filling the `ty` and
//! `scope` annotation slots, and rejecting the first violated rule with
//! one of the 27 numbered [`SemanticError`]s.

pub mod analyzer;
pub mod diagnostics;
pub mod symtab;

pub use analyzer::analyze;
pub use diagnostics::{type_str, SemanticError, SemanticErrorKind};
pub use symtab::{DeclStatus, Symbol, SymbolTable};
