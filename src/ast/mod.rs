//! Source-side AST
//!
//! Data model for the input language. See [`source`] for the node families
//! and [`span`] for position tracking. The Target-side AST lives in
//! [`crate::move_ast`].

pub mod source;
pub mod span;
pub mod walk;

pub use source::{
    AssignOp, BinaryOp, Block, ContractDef, ContractKind, EnumDef, ErrorDef, EventDef, EventParam,
    Expr, ExprKind, FnMutability, FunctionDef, ModifierDef, ModifierInvocation, Param, SourceType,
    SourceUnit, StateVarDecl, Stmt, StmtKind, StructDef, TypeParseError, UnaryOp, VarMutability,
    Visibility,
};
pub use span::{Position, Span};
