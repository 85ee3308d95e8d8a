//! The uCIR instruction set.
//!
//! Instructions are a tagged sum rather than the stringly-typed tuples of
//! classic three-address listings: array dimensions and the pointer
//! qualifier live as first-class fields on [`IrType`], and the textual
//! forms (`alloc_int_3_4`, `load_int_*`) exist only in the output of
//! [`format_instruction`], the single rendering routine.
//!
//! The def/use classification the dataflow analyses rely on is centralised
//! here as well: [`Instr::defined_target`], [`Instr::uses`] and
//! [`Instr::is_removable`] encode the opcode categories, so the solvers
//! match on behaviour instead of opcode spellings.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::ast::BinOp;
use crate::types::UcType;

// ---------------------------------------------------------------------------
// Types as they appear in opcodes
// ---------------------------------------------------------------------------

/// Scalar type component of an opcode suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrBase {
    Int,
    Float,
    Char,
    Bool,
    Void,
    String,
}

impl IrBase {
    pub fn name(&self) -> &'static str {
        match self {
            IrBase::Int => "int",
            IrBase::Float => "float",
            IrBase::Char => "char",
            IrBase::Bool => "bool",
            IrBase::Void => "void",
            IrBase::String => "string",
        }
    }
}

impl fmt::Display for IrBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The type carried by an instruction: scalar base, optional array
/// dimensions, optional pointer qualifier. Rendered as `int`, `int[3][4]`
/// or `int*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrType {
    pub base: IrBase,
    pub dims: SmallVec<[Option<u32>; 2]>,
    pub indirect: bool,
}

impl IrType {
    pub fn scalar(base: IrBase) -> Self {
        IrType {
            base,
            dims: SmallVec::new(),
            indirect: false,
        }
    }

    pub fn with_dims(base: IrBase, dims: &[Option<u32>]) -> Self {
        IrType {
            base,
            dims: dims.iter().copied().collect(),
            indirect: false,
        }
    }

    /// The pointer-qualified form used by loads/stores through an element
    /// address (`load_int_*`).
    pub fn pointer(base: IrBase) -> Self {
        IrType {
            base,
            dims: SmallVec::new(),
            indirect: true,
        }
    }

    /// Maps a uC type: the scalar base comes from the innermost element,
    /// the dimensions from the array nesting.
    pub fn of(ty: &UcType) -> Self {
        let base = match ty.basic() {
            UcType::Int => IrBase::Int,
            UcType::Float => IrBase::Float,
            UcType::Char => IrBase::Char,
            UcType::Bool => IrBase::Bool,
            UcType::String => IrBase::String,
            UcType::Void => IrBase::Void,
            UcType::Array(_) => unreachable!("basic() never returns an array"),
        };
        IrType {
            base,
            dims: ty.dims().into_iter().collect(),
            indirect: false,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for dim in &self.dims {
            match dim {
                Some(n) => write!(f, "[{}]", n)?,
                None => f.write_str("[]")?,
            }
        }
        if self.indirect {
            f.write_str("*")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A literal operand of `literal_*` / `global_*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LitValue {
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
}

impl fmt::Display for LitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LitValue::Int(v) => write!(f, "{}", v),
            // Debug formatting keeps the trailing `.0` on whole floats.
            LitValue::Float(v) => write!(f, "{:?}", v),
            LitValue::Char(c) => write!(f, "{}", c),
            LitValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Initializer of a `global_*` instruction: a scalar literal or a nested
/// list mirroring the declared array shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GlobalInit {
    Value(LitValue),
    List(Vec<GlobalInit>),
}

impl fmt::Display for GlobalInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // String data is quoted in the global section.
            GlobalInit::Value(LitValue::Str(s)) => write!(f, "'{}'", s),
            GlobalInit::Value(v) => write!(f, "{}", v),
            GlobalInit::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Binary ALU opcodes
// ---------------------------------------------------------------------------

/// The arithmetic/relational/logical binary opcodes of uCIR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinAlu {
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

impl BinAlu {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinAlu::Add => "add",
            BinAlu::Sub => "sub",
            BinAlu::Mul => "mul",
            BinAlu::Div => "div",
            BinAlu::Mod => "mod",
            BinAlu::Lt => "lt",
            BinAlu::Le => "le",
            BinAlu::Gt => "gt",
            BinAlu::Ge => "ge",
            BinAlu::Eq => "eq",
            BinAlu::Ne => "ne",
            BinAlu::And => "and",
            BinAlu::Or => "or",
        }
    }
}

impl From<BinOp> for BinAlu {
    fn from(op: BinOp) -> Self {
        match op {
            BinOp::Add => BinAlu::Add,
            BinOp::Sub => BinAlu::Sub,
            BinOp::Mul => BinAlu::Mul,
            BinOp::Div => BinAlu::Div,
            BinOp::Mod => BinAlu::Mod,
            BinOp::Lt => BinAlu::Lt,
            BinOp::Le => BinAlu::Le,
            BinOp::Gt => BinAlu::Gt,
            BinOp::Ge => BinAlu::Ge,
            BinOp::Eq => BinAlu::Eq,
            BinOp::Ne => BinAlu::Ne,
            BinOp::And => BinAlu::And,
            BinOp::Or => BinAlu::Or,
        }
    }
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// A single uCIR instruction.
///
/// Operand conventions: `%name` is a function-local slot or temporary,
/// `@name` a module-global; the last operand of a value-producing
/// instruction is its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    /// Block label marker, rendered `name:`.
    Label(String),
    /// Function header: `define_<ty> @name (params)`.
    Define {
        ty: IrType,
        name: String,
        params: Vec<(IrType, String)>,
    },
    Entry,
    Alloc {
        ty: IrType,
        target: String,
    },
    Global {
        ty: IrType,
        name: String,
        init: Option<GlobalInit>,
    },
    Load {
        ty: IrType,
        src: String,
        target: String,
    },
    Store {
        ty: IrType,
        src: String,
        target: String,
    },
    Literal {
        ty: IrType,
        value: LitValue,
        target: String,
    },
    /// Element address: `target = elem_<ty> base index`.
    Elem {
        ty: IrType,
        base: String,
        index: String,
        target: String,
    },
    Binary {
        op: BinAlu,
        ty: IrType,
        left: String,
        right: String,
        target: String,
    },
    Not {
        ty: IrType,
        src: String,
        target: String,
    },
    SiToFp {
        src: String,
        target: String,
    },
    FpToSi {
        src: String,
        target: String,
    },
    Param {
        ty: IrType,
        src: String,
    },
    Call {
        ty: IrType,
        callee: String,
        target: String,
    },
    /// `return_<ty> value` or `return_void`.
    Return {
        ty: IrType,
        value: Option<String>,
    },
    Print {
        ty: IrType,
        src: String,
    },
    Read {
        ty: IrType,
        target: String,
    },
    Jump {
        target: String,
    },
    CBranch {
        cond: String,
        taken: String,
        fall_through: String,
    },
}

impl Instr {
    /// The name this instruction writes, if it writes one.
    ///
    /// These are exactly the entries of the per-function definition map;
    /// `define` parameters are handled separately by the numbering pass.
    pub fn defined_target(&self) -> Option<&str> {
        match self {
            Instr::Store { target, .. }
            | Instr::Literal { target, .. }
            | Instr::Load { target, .. }
            | Instr::Call { target, .. }
            | Instr::Not { target, .. }
            | Instr::SiToFp { target, .. }
            | Instr::FpToSi { target, .. }
            | Instr::Elem { target, .. }
            | Instr::Binary { target, .. }
            | Instr::Read { target, .. } => Some(target),
            _ => None,
        }
    }

    /// The names this instruction reads, in operand order. Drives the
    /// live-variable `used` sets.
    pub fn uses(&self) -> Vec<&str> {
        match self {
            Instr::Store { src, .. }
            | Instr::Load { src, .. }
            | Instr::Not { src, .. }
            | Instr::SiToFp { src, .. }
            | Instr::FpToSi { src, .. }
            | Instr::Print { src, .. }
            | Instr::Param { src, .. } => vec![src],
            Instr::Call { callee, .. } => vec![callee],
            Instr::Elem { base, index, .. } => vec![base, index],
            Instr::Binary { left, right, .. } => vec![left, right],
            Instr::Return { value: Some(v), .. } => vec![v],
            Instr::CBranch { cond, .. } => vec![cond],
            _ => vec![],
        }
    }

    /// True for the opcodes dead-code elimination may remove when their
    /// target is dead. Side-effecting opcodes are never candidates.
    pub fn is_removable(&self) -> bool {
        matches!(
            self,
            Instr::Store { .. }
                | Instr::Literal { .. }
                | Instr::Load { .. }
                | Instr::Call { .. }
                | Instr::Binary { .. }
        )
    }

    /// True for the opcodes that end a block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instr::Jump { .. } | Instr::CBranch { .. } | Instr::Return { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Renders one instruction in the printed uCIR form.
///
/// Globals and labels are unindented, everything else takes a two-space
/// indent; value-producing opcodes print as `target = op ty operands`.
pub fn format_instruction(instr: &Instr) -> String {
    match instr {
        Instr::Label(name) => format!("{}:", name),
        Instr::Entry => "entry".to_string(),
        Instr::Define { ty, name, params } => {
            let params = params
                .iter()
                .map(|(t, reg)| format!("{} {}", t, reg))
                .collect::<Vec<_>>()
                .join(", ");
            format!("\ndefine {} {} ({})", ty, name, params)
        }
        Instr::Global { ty, name, init } => match init {
            Some(value) => format!("{} = global {} {}", name, ty, value),
            None => format!("{} = global {}", name, ty),
        },
        Instr::Jump { target } => format!("  jump label {}", target),
        Instr::CBranch {
            cond,
            taken,
            fall_through,
        } => format!("  cbranch {} label {} label {}", cond, taken, fall_through),
        Instr::Return { ty, value } => match value {
            Some(v) => format!("  return {} {}", ty, v),
            None => "  return".to_string(),
        },
        Instr::Print { ty, src } => format!("  print {} {}", ty, src),
        Instr::SiToFp { src, target } => format!("  {} = sitofp {}", target, src),
        Instr::FpToSi { src, target } => format!("  {} = fptosi {}", target, src),
        Instr::Store { ty, src, target } => format!("  store {} {} {}", ty, src, target),
        Instr::Param { ty, src } => format!("  param {} {}", ty, src),
        Instr::Alloc { ty, target } => format!("  {} = alloc {}", target, ty),
        Instr::Load { ty, src, target } => format!("  {} = load {} {}", target, ty, src),
        Instr::Literal { ty, value, target } => {
            format!("  {} = literal {} {}", target, ty, value)
        }
        Instr::Elem {
            ty,
            base,
            index,
            target,
        } => format!("  {} = elem {} {} {}", target, ty, base, index),
        Instr::Binary {
            op,
            ty,
            left,
            right,
            target,
        } => format!("  {} = {} {} {} {}", target, op.mnemonic(), ty, left, right),
        Instr::Not { ty, src, target } => format!("  {} = not {} {}", target, ty, src),
        Instr::Call { ty, callee, target } => {
            format!("  {} = call {} {}", target, ty, callee)
        }
        Instr::Read { ty, target } => format!("  {} = read {}", target, ty),
    }
}

/// Renders a whole instruction list, one instruction per line.
pub fn format_code(code: &[Instr]) -> String {
    let mut out = String::new();
    for instr in code {
        out.push_str(&format_instruction(instr));
        out.push('\n');
    }
    out
}
