//! uC front-end: lexer and recursive-descent parser.
//!
//! [`parse`] takes source text and returns the [`ucc_core::ast::Program`]
//! root, or the first fatal lexical/syntactic diagnostic. The token stream
//! is also exposed for tools that only need scanning.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use error::{FrontError, LexError, ParseError};
pub use lexer::tokenize;
pub use parser::parse;
