//! External tool boundary
//!
//! The core consumes three optional collaborators through trait objects:
//! a Target-syntax validator, a Target compiler for the compile-check
//! stage, and a formatter. All three are blocking calls with a deadline the
//! caller supplies; an implementation that cannot finish in time must
//! return a failure-shaped report rather than hang. When a tool is absent
//! the pipeline simply skips that stage.

use std::time::Duration;

use serde::Serialize;

/// Top-level names found by the validator
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructureSummary {
    pub modules: Vec<String>,
    pub functions: Vec<String>,
    pub structs: Vec<String>,
}

/// Outcome of validating one emitted module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub structure: Option<StructureSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

impl IssueSeverity {
    /// Severity strings from external compilers, normalized
    /// case-insensitively; anything unrecognized is an error.
    pub fn parse(text: &str) -> IssueSeverity {
        match text.to_lowercase().as_str() {
            "warning" | "warn" => IssueSeverity::Warning,
            _ => IssueSeverity::Error,
        }
    }
}

/// One issue reported by the external compiler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileIssue {
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub severity: IssueSeverity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileReport {
    pub success: bool,
    pub issues: Vec<CompileIssue>,
}

impl CompileReport {
    /// The report an implementation returns when the deadline passes
    pub fn timed_out(timeout: Duration) -> CompileReport {
        CompileReport {
            success: false,
            issues: vec![CompileIssue {
                source: String::new(),
                line: 0,
                column: 0,
                severity: IssueSeverity::Error,
                message: format!("compilation exceeded the {}s deadline", timeout.as_secs()),
            }],
        }
    }
}

/// What the compile-check stage hands to the external compiler
#[derive(Debug)]
pub struct CompileRequest<'a> {
    /// `(module name, module source)` pairs
    pub modules: &'a [(String, String)],
    pub address: &'a str,
    pub package_name: &'a str,
    pub timeout: Duration,
}

/// Optional syntax validator for emitted modules
pub trait TargetValidator {
    fn validate(&self, source: &str) -> ValidationReport;
}

/// Optional compile-check backend
pub trait TargetCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> CompileReport;
}

/// Optional output formatter; `None` means the input is kept as-is
pub trait TargetFormatter {
    fn format(&self, source: &str, timeout: Duration) -> Option<String>;
}

/// The set of wired collaborators; all optional
#[derive(Default)]
pub struct ExternalTools {
    pub validator: Option<Box<dyn TargetValidator>>,
    pub compiler: Option<Box<dyn TargetCompiler>>,
    pub formatter: Option<Box<dyn TargetFormatter>>,
}

impl ExternalTools {
    pub fn none() -> Self {
        ExternalTools::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_strings_normalize_case_insensitively() {
        assert_eq!(IssueSeverity::parse("Warning"), IssueSeverity::Warning);
        assert_eq!(IssueSeverity::parse("WARN"), IssueSeverity::Warning);
        assert_eq!(IssueSeverity::parse("error"), IssueSeverity::Error);
        assert_eq!(IssueSeverity::parse("fatal"), IssueSeverity::Error);
    }
}
