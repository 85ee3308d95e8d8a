//! Scoped symbol table with shadow-stack semantics.
//!
//! Each name maps to a stack of bindings; shadowing pushes, leaving a
//! scope pops every name the scope introduced and restores the previous
//! binding (or removes the name entirely). A parallel per-scope name list
//! makes `end_scope` cheap.

use std::collections::HashMap;

use indexmap::IndexMap;
use ucc_core::types::UcType;

/// One binding: a type, plus the ordered parameter signature for
/// functions (`None` marks a plain variable).
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub ty: UcType,
    pub params: Option<IndexMap<String, UcType>>,
}

impl Symbol {
    pub fn var(ty: UcType) -> Self {
        Symbol { ty, params: None }
    }

    pub fn function(ty: UcType, params: IndexMap<String, UcType>) -> Self {
        Symbol {
            ty,
            params: Some(params),
        }
    }
}

/// Where (if anywhere) a name is currently declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclStatus {
    Undeclared,
    /// Declared in some enclosing scope.
    Outer,
    /// Declared in the innermost open scope.
    Current,
}

/// The table itself: binding stacks plus the scope discipline.
#[derive(Debug, Default)]
pub struct SymbolTable {
    bindings: HashMap<String, Vec<Symbol>>,
    scopes: Vec<Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn begin_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Pops the innermost scope, restoring the previous binding of every
    /// name it introduced.
    pub fn end_scope(&mut self) {
        let names = self.scopes.pop().unwrap_or_default();
        for name in names {
            if let Some(stack) = self.bindings.get_mut(&name) {
                stack.pop();
                if stack.is_empty() {
                    self.bindings.remove(&name);
                }
            }
        }
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declares `name` in the innermost scope, shadowing any outer binding.
    pub fn add(&mut self, name: &str, symbol: Symbol) {
        self.bindings
            .entry(name.to_string())
            .or_default()
            .push(symbol);
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(name.to_string());
        }
    }

    /// The live binding of `name`, innermost first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.bindings.get(name).and_then(|stack| stack.last())
    }

    /// Replaces the innermost binding of `name` in place, leaving the
    /// scope bookkeeping untouched. Used when an array declaration's open
    /// dimensions are resolved from its initializer.
    pub fn replace_top(&mut self, name: &str, symbol: Symbol) {
        if let Some(top) = self
            .bindings
            .get_mut(name)
            .and_then(|stack| stack.last_mut())
        {
            *top = symbol;
        }
    }

    /// The parameter signature of `name`, if it is bound to a function.
    pub fn params(&self, name: &str) -> Option<&IndexMap<String, UcType>> {
        self.lookup(name).and_then(|sym| sym.params.as_ref())
    }

    pub fn declared(&self, name: &str) -> DeclStatus {
        let bound = self.bindings.contains_key(name);
        if !bound {
            return DeclStatus::Undeclared;
        }
        let in_current = self
            .scopes
            .last()
            .is_some_and(|scope| scope.iter().any(|n| n == name));
        if in_current {
            DeclStatus::Current
        } else {
            DeclStatus::Outer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_after_add() {
        let mut table = SymbolTable::new();
        table.begin_scope();
        table.add("x", Symbol::var(UcType::Int));
        assert_eq!(table.lookup("x").map(|s| &s.ty), Some(&UcType::Int));
        assert_eq!(table.declared("x"), DeclStatus::Current);
        assert_eq!(table.declared("y"), DeclStatus::Undeclared);
    }

    #[test]
    fn shadowing_restores_on_end_scope() {
        let mut table = SymbolTable::new();
        table.begin_scope();
        table.add("x", Symbol::var(UcType::Int));
        table.begin_scope();
        table.add("x", Symbol::var(UcType::Float));
        assert_eq!(table.lookup("x").map(|s| &s.ty), Some(&UcType::Float));
        assert_eq!(table.declared("x"), DeclStatus::Current);

        table.end_scope();
        assert_eq!(table.lookup("x").map(|s| &s.ty), Some(&UcType::Int));
        assert_eq!(table.declared("x"), DeclStatus::Current);

        table.end_scope();
        assert_eq!(table.lookup("x"), None);
    }

    #[test]
    fn outer_vs_current() {
        let mut table = SymbolTable::new();
        table.begin_scope();
        table.add("x", Symbol::var(UcType::Int));
        table.begin_scope();
        assert_eq!(table.declared("x"), DeclStatus::Outer);
        table.end_scope();
        assert_eq!(table.declared("x"), DeclStatus::Current);
    }

    #[test]
    fn function_signature_is_ordered() {
        let mut table = SymbolTable::new();
        table.begin_scope();
        let mut params = IndexMap::new();
        params.insert("b".to_string(), UcType::Float);
        params.insert("a".to_string(), UcType::Int);
        table.add("f", Symbol::function(UcType::Int, params));

        let sig = table.params("f").expect("f is a function");
        let names: Vec<&str> = sig.keys().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);

        table.add("v", Symbol::var(UcType::Int));
        assert!(table.params("v").is_none());
    }

    #[test]
    fn end_scope_removes_only_scope_names() {
        let mut table = SymbolTable::new();
        table.begin_scope();
        table.add("keep", Symbol::var(UcType::Int));
        table.begin_scope();
        table.add("drop", Symbol::var(UcType::Char));
        table.end_scope();
        assert!(table.lookup("keep").is_some());
        assert!(table.lookup("drop").is_none());
    }
}
