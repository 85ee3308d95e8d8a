//! Semantic diagnostics: the fixed numbered message set.
//!
//! Every rejection the analyser can produce is one of these variants; the
//! numeric code and the exact message text come from the diagnostic
//! contract (codes 1-27). Rendering is
//! `SemanticError: <message> @ <line>:<col>`, and the first violation is
//! fatal.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ucc_core::coord::Coord;
use ucc_core::types::UcType;

/// The numbered semantic error conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum SemanticErrorKind {
    /// 1
    #[error("{name} is not defined")]
    NotDefined { name: String },
    /// 2
    #[error("{ltype} must be of type(int)")]
    IndexMustBeInt { ltype: String },
    /// 3
    #[error("Expression must be of type(bool)")]
    AssertNotBool,
    /// 4
    #[error("Cannot assign {rtype} to {ltype}")]
    AssignTypeMismatch { ltype: String, rtype: String },
    /// 5
    #[error("Assignment operator {name} is not supported by {ltype}")]
    AssignOpUnsupported { name: String, ltype: String },
    /// 6
    #[error("Binary operator {name} does not have matching LHS/RHS types")]
    BinaryOperandMismatch { name: String },
    /// 7
    #[error("Binary operator {name} is not supported by {ltype}")]
    BinaryOpUnsupported { name: String, ltype: String },
    /// 8
    #[error("Break statement must be inside a loop")]
    BreakOutsideLoop,
    /// 9
    #[error("Array dimension mismatch")]
    ArrayDimensionMismatch,
    /// 10
    #[error("Size mismatch on {name} initialization")]
    InitSizeMismatch { name: String },
    /// 11
    #[error("{name} initialization type mismatch")]
    InitTypeMismatch { name: String },
    /// 12
    #[error("{name} initialization must be a single element")]
    InitMustBeSingle { name: String },
    /// 13
    #[error("Lists have different sizes")]
    ListSizesDiffer,
    /// 14
    #[error("List & variable have different sizes")]
    ListVariableSizesDiffer,
    /// 15
    #[error("conditional expression is {ltype}, not type(bool)")]
    WhileCondNotBool { ltype: String },
    /// 16
    #[error("{name} is not a function")]
    NotAFunction { name: String },
    /// 17
    #[error("no. arguments to call {name} function mismatch")]
    ArgumentCountMismatch { name: String },
    /// 18
    #[error("Type mismatch with parameter {name}")]
    ParameterTypeMismatch { name: String },
    /// 19
    #[error("The condition expression must be of type(bool)")]
    IfCondNotBool,
    /// 20
    #[error("Expression must be a constant")]
    NotAConstant,
    /// 21
    #[error("Expression is not of basic type")]
    NotBasicType,
    /// 22
    #[error("{name} does not reference a variable of basic type")]
    NotBasicVariable { name: String },
    /// 23
    #[error("\n{name}\nIs not a variable")]
    NotAVariable { name: String },
    /// 24
    #[error("Return of {ltype} is incompatible with {rtype} function definition")]
    ReturnTypeMismatch { ltype: String, rtype: String },
    /// 25
    #[error("Name {name} is already defined in this scope")]
    Redeclaration { name: String },
    /// 26
    #[error("Unary operator {name} is not supported")]
    UnaryOpUnsupported { name: String },
    /// 27
    #[error("Undefined error")]
    Undefined,
}

impl SemanticErrorKind {
    /// The numeric code of this condition.
    pub fn code(&self) -> u8 {
        use SemanticErrorKind::*;
        match self {
            NotDefined { .. } => 1,
            IndexMustBeInt { .. } => 2,
            AssertNotBool => 3,
            AssignTypeMismatch { .. } => 4,
            AssignOpUnsupported { .. } => 5,
            BinaryOperandMismatch { .. } => 6,
            BinaryOpUnsupported { .. } => 7,
            BreakOutsideLoop => 8,
            ArrayDimensionMismatch => 9,
            InitSizeMismatch { .. } => 10,
            InitTypeMismatch { .. } => 11,
            InitMustBeSingle { .. } => 12,
            ListSizesDiffer => 13,
            ListVariableSizesDiffer => 14,
            WhileCondNotBool { .. } => 15,
            NotAFunction { .. } => 16,
            ArgumentCountMismatch { .. } => 17,
            ParameterTypeMismatch { .. } => 18,
            IfCondNotBool => 19,
            NotAConstant => 20,
            NotBasicType => 21,
            NotBasicVariable { .. } => 22,
            NotAVariable { .. } => 23,
            ReturnTypeMismatch { .. } => 24,
            Redeclaration { .. } => 25,
            UnaryOpUnsupported { .. } => 26,
            Undefined => 27,
        }
    }
}

/// A fatal semantic diagnostic with its source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("SemanticError: {kind} {coord}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub coord: Coord,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, coord: Coord) -> Self {
        SemanticError { kind, coord }
    }

    pub fn code(&self) -> u8 {
        self.kind.code()
    }
}

/// The `type(<name>)` wrapping diagnostics use for type operands.
pub fn type_str(ty: &UcType) -> String {
    format!("type({})", ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendering_embeds_prefix_and_coord() {
        let err = SemanticError::new(
            SemanticErrorKind::NotDefined { name: "x".into() },
            Coord::new(1, 20),
        );
        assert_eq!(err.to_string(), "SemanticError: x is not defined @ 1:20");
        assert_eq!(err.code(), 1);
    }

    #[test]
    fn parameterised_messages() {
        let err = SemanticErrorKind::AssignTypeMismatch {
            ltype: type_str(&UcType::Int),
            rtype: type_str(&UcType::Float),
        };
        assert_eq!(err.to_string(), "Cannot assign type(float) to type(int)");
        assert_eq!(err.code(), 4);

        let err = SemanticErrorKind::WhileCondNotBool {
            ltype: type_str(&UcType::Int),
        };
        assert_eq!(
            err.to_string(),
            "conditional expression is type(int), not type(bool)"
        );
        assert_eq!(err.code(), 15);
    }

    #[test]
    fn codes_cover_one_through_twenty_seven() {
        use SemanticErrorKind::*;
        let all = vec![
            NotDefined { name: String::new() },
            IndexMustBeInt { ltype: String::new() },
            AssertNotBool,
            AssignTypeMismatch { ltype: String::new(), rtype: String::new() },
            AssignOpUnsupported { name: String::new(), ltype: String::new() },
            BinaryOperandMismatch { name: String::new() },
            BinaryOpUnsupported { name: String::new(), ltype: String::new() },
            BreakOutsideLoop,
            ArrayDimensionMismatch,
            InitSizeMismatch { name: String::new() },
            InitTypeMismatch { name: String::new() },
            InitMustBeSingle { name: String::new() },
            ListSizesDiffer,
            ListVariableSizesDiffer,
            WhileCondNotBool { ltype: String::new() },
            NotAFunction { name: String::new() },
            ArgumentCountMismatch { name: String::new() },
            ParameterTypeMismatch { name: String::new() },
            IfCondNotBool,
            NotAConstant,
            NotBasicType,
            NotBasicVariable { name: String::new() },
            NotAVariable { name: String::new() },
            ReturnTypeMismatch { ltype: String::new(), rtype: String::new() },
            Redeclaration { name: String::new() },
            UnaryOpUnsupported { name: String::new() },
            Undefined,
        ];
        let codes: Vec<u8> = all.iter().map(|k| k.code()).collect();
        assert_eq!(codes, (1..=27).collect::<Vec<u8>>());
    }
}
