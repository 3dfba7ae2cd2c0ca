//! Solidity-to-Move source transpiler
//!
//! Translates contracts written in a Solidity-0.8-shaped language into
//! idiomatic Aptos Move v2 modules. The output is *source*, meant to be
//! read, audited and extended by people — not bytecode.
//!
//! # Pipeline
//!
//! ```text
//! tagged JSON ──► Source AST ──► IR ──► augmented IR ──► Move AST ──► text
//!   (external      (ast)       (lift)   (analysis)     (transform,   (printer)
//!    parser)                                             specgen)
//! ```
//!
//! - **lift** flattens inheritance, normalizes names and allocates error
//!   codes;
//! - **analysis** classifies every state variable by write pattern and
//!   partitions them into resource groups;
//! - **transform** lowers expressions and functions onto the linear,
//!   resource-keyed runtime: table borrows with defaults, write-backs for
//!   mutated copies, reentrancy guards, an `initialize` entry function;
//! - **specgen** optionally derives formal abort/modifies conditions;
//! - **printer** emits deterministic concrete syntax.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sol2move::{transpile, TranspileOptions};
//!
//! let output = transpile(&source_ast_json, &TranspileOptions::default());
//! for module in &output.modules {
//!     std::fs::write(format!("sources/{}.move", module.name), &module.source)?;
//! }
//! ```
//!
//! Source parsing is external: the input is the Source AST as tagged JSON
//! (see [`ast::source`]). Library users may also build a
//! [`SourceUnit`](ast::SourceUnit) programmatically and call
//! [`transpile_unit`].

pub mod analysis;
pub mod ast;
pub mod diagnostics;
pub mod external;
pub mod ir;
pub mod lift;
pub mod manifest;
pub mod move_ast;
pub mod options;
pub mod pipeline;
pub mod printer;
pub mod runtime_shim;
pub mod specgen;
pub mod transform;

pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use options::{CallStyle, OptimizationLevel, TranspileOptions};
pub use pipeline::{transpile, transpile_unit, EmittedModule, TranspileOutput, Transpiler};
