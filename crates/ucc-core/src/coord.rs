//! Source coordinates attached to every AST node and diagnostic.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Line/column position of a syntactic element (both 1-based).
///
/// Rendered as `@ line:col`, the form every diagnostic embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coord {
    pub line: u32,
    pub column: u32,
}

impl Coord {
    pub fn new(line: u32, column: u32) -> Self {
        Coord { line, column }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@ {}:{}", self.line, self.column)
    }
}
