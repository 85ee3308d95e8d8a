//! Abstract syntax tree for uC.
//!
//! The tree is a tagged sum over roughly thirty node kinds. Every node
//! carries its source [`Coord`]; expression nodes additionally carry
//! annotation slots that are filled in place by later stages and read-only
//! afterwards:
//!
//! - `ty` -- assigned by semantic analysis,
//! - `gen_location` -- the temporary holding the node's value after IR
//!   generation,
//! - `mem_location` -- the address temporary for array references,
//! - `scope` -- set on identifier occurrences after successful resolution.
//!
//! Stages receive `&mut Program` and never remove or reorder nodes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coord::Coord;
use crate::types::UcType;

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Binary operators, arithmetic and relational together; which category an
/// occurrence falls into is decided by the operand type's admissibility
/// tables ([`UcType::supports_binary`] / [`UcType::supports_rel`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    /// Source-level spelling, used in diagnostics.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Unary operators. The four increment/decrement forms each have their
/// own variant; diagnostics spell the postfix ones `p++` / `p--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    Not,
    Neg,
    Plus,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnOp::Not => "!",
            UnOp::Neg => "-",
            UnOp::Plus => "+",
            UnOp::PreInc => "++",
            UnOp::PreDec => "--",
            UnOp::PostInc => "p++",
            UnOp::PostDec => "p--",
        }
    }

    /// True for the `++`/`--` family, which mutates its operand.
    pub fn is_step(&self) -> bool {
        matches!(
            self,
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec
        )
    }

    pub fn is_postfix(&self) -> bool {
        matches!(self, UnOp::PostInc | UnOp::PostDec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl AssignOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
        }
    }

    /// The underlying binary operator of a compound assignment;
    /// `None` for plain `=`.
    pub fn binary(&self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinOp::Add),
            AssignOp::SubAssign => Some(BinOp::Sub),
            AssignOp::MulAssign => Some(BinOp::Mul),
            AssignOp::DivAssign => Some(BinOp::Div),
            AssignOp::ModAssign => Some(BinOp::Mod),
        }
    }
}

// ---------------------------------------------------------------------------
// Type specifiers and identifiers
// ---------------------------------------------------------------------------

/// The four type keywords admissible in declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeName {
    Void,
    Char,
    Int,
    Float,
}

impl TypeName {
    pub fn uc_type(&self) -> UcType {
        match self {
            TypeName::Void => UcType::Void,
            TypeName::Char => UcType::Char,
            TypeName::Int => UcType::Int,
            TypeName::Float => UcType::Float,
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeName::Void => "void",
            TypeName::Char => "char",
            TypeName::Int => "int",
            TypeName::Float => "float",
        })
    }
}

/// A type keyword occurrence in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: TypeName,
    pub coord: Coord,
}

/// An identifier occurrence. `scope` is the symbol-table depth at the
/// moment of successful resolution; `None` until then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub coord: Coord,
    pub scope: Option<usize>,
}

impl Ident {
    pub fn new(name: impl Into<String>, coord: Coord) -> Self {
        Ident {
            name: name.into(),
            coord,
            scope: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
}

/// An expression node: variant kind plus the shared annotation slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub coord: Coord,
    /// Filled by semantic analysis.
    pub ty: Option<UcType>,
    /// Temporary holding this expression's value after IR generation.
    pub gen_location: Option<String>,
    /// Address temporary, set only on array references.
    pub mem_location: Option<String>,
}

impl Expr {
    pub fn new(kind: ExprKind, coord: Coord) -> Self {
        Expr {
            kind,
            coord,
            ty: None,
            gen_location: None,
            mem_location: None,
        }
    }

    /// A compact sketch of the expression for diagnostics that embed the
    /// offending node (read targets, code 23).
    pub fn describe(&self) -> String {
        match &self.kind {
            ExprKind::Id(id) => id.name.clone(),
            ExprKind::Const(Constant::Int(v)) => v.to_string(),
            ExprKind::Const(Constant::Float(v)) => format!("{:?}", v),
            ExprKind::Const(Constant::Char(c)) => c.to_string(),
            ExprKind::Const(Constant::Str(s)) => s.clone(),
            ExprKind::Binary { op, .. } => op.symbol().to_string(),
            ExprKind::Unary { op, .. } => op.symbol().to_string(),
            ExprKind::Assign { op, .. } => op.symbol().to_string(),
            ExprKind::ArrayRef { array, .. } => array.describe(),
            ExprKind::Call { callee, .. } => callee.name.clone(),
            ExprKind::Cast { to, .. } => to.name.to_string(),
            ExprKind::List(_) => "expression list".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Const(Constant),
    Id(Ident),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        lvalue: Box<Expr>,
        rvalue: Box<Expr>,
    },
    ArrayRef {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Ident,
        args: Vec<Expr>,
    },
    Cast {
        to: TypeSpec,
        operand: Box<Expr>,
    },
    /// Comma expression list; elements evaluate left to right.
    List(Vec<Expr>),
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// Array/scalar initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Init {
    Expr(Expr),
    List(InitList),
}

impl Init {
    pub fn coord(&self) -> Coord {
        match self {
            Init::Expr(e) => e.coord,
            Init::List(l) => l.coord,
        }
    }

    /// The type assigned to this initializer by semantic analysis.
    pub fn ty(&self) -> Option<&UcType> {
        match self {
            Init::Expr(e) => e.ty.as_ref(),
            Init::List(l) => l.ty.as_ref(),
        }
    }
}

/// Braced initializer list; nesting mirrors the declared dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitList {
    pub items: Vec<Init>,
    pub coord: Coord,
    /// Filled by semantic analysis: an array type built from the first
    /// element's type and the list length.
    pub ty: Option<UcType>,
}

/// A single variable declaration: `int a`, `float m[2][3] = {...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub spec: TypeSpec,
    pub name: Ident,
    /// Outermost-first dimensions; empty for scalars. `None` entries come
    /// from `[]` and are resolved from the initializer.
    pub dims: Vec<Option<u32>>,
    pub init: Option<Init>,
    /// Declared type, filled by semantic analysis.
    pub ty: Option<UcType>,
    pub coord: Coord,
}

/// A function parameter (`type name`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub spec: TypeSpec,
    pub name: Ident,
    pub coord: Coord,
}

/// A function definition with its body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDef {
    pub ret: TypeSpec,
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Compound,
    pub coord: Coord,
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// `{ declaration* statement* }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compound {
    pub decls: Vec<Decl>,
    pub stmts: Vec<Stmt>,
    pub coord: Coord,
}

/// Initializer clause of a `for` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInit {
    Decls(Vec<Decl>),
    Expr(Expr),
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Expr),
    Compound(Compound),
    If {
        cond: Expr,
        then_stat: Box<Stmt>,
        else_stat: Option<Box<Stmt>>,
        coord: Coord,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        coord: Coord,
    },
    For {
        init: ForInit,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
        coord: Coord,
    },
    Break {
        coord: Coord,
    },
    Return {
        expr: Option<Expr>,
        coord: Coord,
    },
    Assert {
        expr: Expr,
        coord: Coord,
    },
    Print {
        args: Vec<Expr>,
        coord: Coord,
    },
    Read {
        targets: Vec<Expr>,
        coord: Coord,
    },
    Empty {
        coord: Coord,
    },
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GlobalItem {
    Decls(Vec<Decl>),
    Func(FuncDef),
}

/// The root node: the ordered list of global declarations and function
/// definitions of a translation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<GlobalItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u32, col: u32) -> Coord {
        Coord::new(line, col)
    }

    #[test]
    fn operator_symbols() {
        assert_eq!(BinOp::Mod.symbol(), "%");
        assert_eq!(BinOp::And.symbol(), "&&");
        assert_eq!(UnOp::PostDec.symbol(), "p--");
        assert_eq!(AssignOp::DivAssign.symbol(), "/=");
    }

    #[test]
    fn compound_assignment_maps_to_binary() {
        assert_eq!(AssignOp::AddAssign.binary(), Some(BinOp::Add));
        assert_eq!(AssignOp::Assign.binary(), None);
    }

    #[test]
    fn step_operators() {
        assert!(UnOp::PostInc.is_step());
        assert!(UnOp::PostInc.is_postfix());
        assert!(UnOp::PreDec.is_step());
        assert!(!UnOp::PreDec.is_postfix());
        assert!(!UnOp::Neg.is_step());
    }

    #[test]
    fn fresh_expr_has_empty_annotations() {
        let e = Expr::new(ExprKind::Const(Constant::Int(3)), at(1, 1));
        assert!(e.ty.is_none());
        assert!(e.gen_location.is_none());
        assert!(e.mem_location.is_none());
    }

    #[test]
    fn describe_sketches() {
        let id = Expr::new(ExprKind::Id(Ident::new("x", at(1, 1))), at(1, 1));
        assert_eq!(id.describe(), "x");

        let call = Expr::new(
            ExprKind::Call {
                callee: Ident::new("f", at(1, 1)),
                args: vec![],
            },
            at(1, 1),
        );
        assert_eq!(call.describe(), "f");

        let sum = Expr::new(
            ExprKind::Binary {
                op: BinOp::Add,
                left: Box::new(Expr::new(ExprKind::Const(Constant::Int(1)), at(1, 1))),
                right: Box::new(Expr::new(ExprKind::Const(Constant::Int(2)), at(1, 5))),
            },
            at(1, 1),
        );
        assert_eq!(sum.describe(), "+");
    }

    #[test]
    fn serde_roundtrip_program() {
        let program = Program {
            items: vec![GlobalItem::Decls(vec![Decl {
                spec: TypeSpec {
                    name: TypeName::Int,
                    coord: at(1, 1),
                },
                name: Ident::new("n", at(1, 5)),
                dims: vec![],
                init: Some(Init::Expr(Expr::new(
                    ExprKind::Const(Constant::Int(4)),
                    at(1, 9),
                ))),
                ty: None,
                coord: at(1, 5),
            }])],
        };
        let json = serde_json::to_string(&program).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(program, back);
    }
}
