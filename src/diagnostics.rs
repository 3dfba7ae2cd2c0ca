//! Diagnostics
//!
//! Errors and warnings are collected, not thrown: every phase appends to a
//! [`DiagnosticBag`] owned by the pipeline, and only the coordinator decides
//! what a failure means for the invocation as a whole. The one hard stop is
//! a parse failure of the primary Source unit.

use serde::Serialize;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// The closed set of diagnostic kinds the pipeline produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// External parser rejected the input
    ParseError,
    /// Reference to a name no visible declaration provides
    UnresolvedSymbol,
    /// Module name collides with a reserved helper or another module
    HelperModuleNameConflict,
    /// Pattern with no meaningful Target lowering; marker emitted in place
    UnsupportedConstruct,
    /// Operands cannot be harmonized to a common primitive type
    TypeWideningFailure,
    /// Optional compile-check stage rejected the output
    CompileCheckFailure,
    /// Interface contributed no output module
    InterfaceSkipped,
    /// A contract failed to lift; other contracts still emit
    ContractSkipped,
    /// Two inherited definitions collided; most-derived survived
    BaseOverride,
    /// Signed Source integer lowered to an unsigned Target width
    SignedIntegerLowered,
    /// Integer width rounded up to the nearest Target width
    NonStandardWidth,
    /// Fixed-size array length is not enforced on the Target
    FixedArrayLength,
    /// A token-standard template replaced the normal lowering
    TemplateApplied,
}

/// A single collected error or warning
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    /// Source span, when the producing phase still had one
    pub span: Option<Span>,
    /// Contract the diagnostic belongs to, when known
    pub contract: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            kind,
            message: message.into(),
            span: None,
            contract: None,
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            kind,
            message: message.into(),
            span: None,
            contract: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        if !span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn in_contract(mut self, contract: &str) -> Self {
        self.contract = Some(contract.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)?;
        if let Some(contract) = &self.contract {
            write!(f, " (in {})", contract)?;
        }
        if let Some(span) = &self.span {
            write!(f, " at {}", span)?;
        }
        Ok(())
    }
}

/// Append-only collection of diagnostics for one transpile invocation
#[derive(Debug, Default, Clone)]
pub struct DiagnosticBag {
    items: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        DiagnosticBag::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: DiagnosticBag) {
        self.items.extend(other.items);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.items
    }
}
