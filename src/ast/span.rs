//! Source positions and spans
//!
//! Every node in the Source AST carries a [`Span`] so diagnostics can point
//! back into the original contract text. The external parser supplies these
//! positions; the core never recomputes them.

use serde::{Deserialize, Serialize};

/// A single position in the Source text (0-based line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default)]
    pub offset: u32,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        Position {
            line,
            column,
            offset,
        }
    }
}

/// A half-open range of Source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub start: Position,
    #[serde(default)]
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }

    /// Span for synthesized nodes that have no Source counterpart
    pub fn none() -> Self {
        Span::default()
    }

    /// True when this span carries no real position information
    pub fn is_none(&self) -> bool {
        *self == Span::default()
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start.line + 1, self.start.column + 1)
    }
}
