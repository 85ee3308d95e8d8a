//! The uC type system.
//!
//! Scalars (`int`, `float`, `char`, `bool`, `string`, `void`) plus
//! fixed-dimension arrays. Each type carries the set of unary, binary,
//! relational and assignment operators it admits; the semantic analyser
//! consults these tables instead of hard-coding per-operator rules.
//!
//! Type equality is by rendered name: `int[3][4]` and `int[4][3]` are
//! distinct types, and an unsized `int[]` differs from any sized form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{AssignOp, BinOp, UnOp};

/// A uC type descriptor.
///
/// Basic types behave as process-wide singletons (they are unit variants);
/// array types are built fresh per declaration and may initially lack a
/// size, which the analyser fills in from the initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UcType {
    Int,
    Float,
    Char,
    Bool,
    String,
    Void,
    Array(ArrayType),
}

/// Fixed-dimension array type. Nesting arrays yields matrices:
/// `int a[2][3]` is `Array { element: Array { element: Int, size: 3 }, size: 2 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayType {
    pub element: Box<UcType>,
    pub size: Option<u32>,
}

impl UcType {
    /// Builds an array of `element` with an optional size.
    pub fn array(element: UcType, size: Option<u32>) -> UcType {
        UcType::Array(ArrayType {
            element: Box::new(element),
            size,
        })
    }

    /// Builds a nested array from outermost-first dimensions.
    /// An empty `dims` returns `element` unchanged.
    pub fn with_dims(element: UcType, dims: &[Option<u32>]) -> UcType {
        let mut ty = element;
        for dim in dims.iter().rev() {
            ty = UcType::array(ty, *dim);
        }
        ty
    }

    /// The innermost element type (`self` for scalars).
    pub fn basic(&self) -> &UcType {
        match self {
            UcType::Array(a) => a.element.basic(),
            other => other,
        }
    }

    /// Outermost-first dimension list; empty for scalars.
    pub fn dims(&self) -> Vec<Option<u32>> {
        let mut dims = Vec::new();
        let mut ty = self;
        while let UcType::Array(a) = ty {
            dims.push(a.size);
            ty = &a.element;
        }
        dims
    }

    pub fn is_array(&self) -> bool {
        matches!(self, UcType::Array(_))
    }

    /// True for the types `print` accepts directly: the basic value types,
    /// strings, and char arrays (strings-as-char-arrays).
    pub fn is_printable(&self) -> bool {
        match self {
            UcType::Int | UcType::Float | UcType::Char | UcType::String => true,
            UcType::Array(_) => matches!(self.basic(), UcType::Char),
            _ => false,
        }
    }

    /// Whether `op` is admitted as an arithmetic binary operator on `self`.
    pub fn supports_binary(&self, op: BinOp) -> bool {
        use BinOp::*;
        match self {
            UcType::Int | UcType::Float => {
                matches!(op, Add | Sub | Mul | Div | Mod)
            }
            UcType::String => matches!(op, Add),
            _ => false,
        }
    }

    /// Whether `op` is admitted as a relational operator on `self`
    /// (the result type is then `bool`).
    pub fn supports_rel(&self, op: BinOp) -> bool {
        use BinOp::*;
        match self {
            UcType::Int | UcType::Float => {
                matches!(op, Eq | Ne | Lt | Gt | Le | Ge)
            }
            UcType::Char | UcType::Bool => matches!(op, Eq | Ne | And | Or),
            UcType::String => matches!(op, Eq | Ne),
            UcType::Array(_) => matches!(op, Eq | Ne),
            UcType::Void => false,
        }
    }

    pub fn supports_assign(&self, op: AssignOp) -> bool {
        use AssignOp::*;
        match self {
            UcType::Int | UcType::Float => matches!(
                op,
                Assign | AddAssign | SubAssign | MulAssign | DivAssign | ModAssign
            ),
            UcType::Char | UcType::Bool | UcType::String | UcType::Array(_) => {
                matches!(op, Assign)
            }
            UcType::Void => false,
        }
    }

    pub fn supports_unary(&self, op: UnOp) -> bool {
        use UnOp::*;
        match self {
            UcType::Int => matches!(
                op,
                Neg | Plus | PreInc | PreDec | PostInc | PostDec
            ),
            UcType::Float => matches!(op, Neg | Plus),
            UcType::Bool => matches!(op, Not),
            _ => false,
        }
    }

    /// Rendered-name equality, the notion of type equality used by every
    /// semantic rule. Structural `PartialEq` agrees with it, but the rules
    /// are specified in terms of the rendering.
    pub fn same_as(&self, other: &UcType) -> bool {
        self.to_string() == other.to_string()
    }
}

impl fmt::Display for UcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UcType::Int => f.write_str("int"),
            UcType::Float => f.write_str("float"),
            UcType::Char => f.write_str("char"),
            UcType::Bool => f.write_str("bool"),
            UcType::String => f.write_str("string"),
            UcType::Void => f.write_str("void"),
            UcType::Array(_) => {
                write!(f, "{}", self.basic())?;
                for dim in self.dims() {
                    match dim {
                        Some(n) => write!(f, "[{}]", n)?,
                        None => f.write_str("[]")?,
                    }
                }
                Ok(())
            }
        }
    }
}
