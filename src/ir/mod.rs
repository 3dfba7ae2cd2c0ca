//! Intermediate representation
//!
//! One [`IrContract`] per non-interface Source contract, produced by the
//! lifter after inheritance flattening. The IR is purely data: declaration
//! order is preserved, names are already in Target convention, and no
//! symbol appears twice (later declarations in the linearized base chain
//! override earlier ones by name).
//!
//! Function bodies keep their Source statements untouched; identifier
//! renaming happens uniformly at transform time so the lifter never has to
//! rewrite expression trees.

pub mod error_codes;

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::{
    Block, ContractKind, EventParam, Expr, ModifierInvocation, Param, SourceType, Span,
    VarMutability, Visibility,
};
use crate::ast::source::FnMutability;
pub use error_codes::{ErrorCode, ErrorCodeTable, FIRST_MESSAGE_CODE, STANDARD_CODES};

#[derive(Debug, Clone)]
pub struct IrStateVar {
    /// Target-convention name (snake_case)
    pub name: String,
    pub source_name: String,
    pub ty: SourceType,
    pub mutability: VarMutability,
    pub visibility: Visibility,
    pub initial: Option<Expr>,
    /// Contract the declaration was inherited from, if not the leaf
    pub inherited_from: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IrFunction {
    /// Target-convention name (snake_case)
    pub name: String,
    pub source_name: String,
    pub visibility: Visibility,
    pub mutability: FnMutability,
    pub is_constructor: bool,
    pub modifiers: Vec<ModifierInvocation>,
    pub params: Vec<Param>,
    pub returns: Vec<Param>,
    pub body: Option<Block>,
    pub inherited_from: Option<String>,
    /// Flattened in from a library; stays private in the output
    pub from_library: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IrModifier {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub inherited_from: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IrEvent {
    pub name: String,
    pub params: Vec<EventParam>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IrStruct {
    pub name: String,
    pub fields: Vec<Param>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IrEnum {
    pub name: String,
    pub variants: Vec<String>,
    pub span: Span,
}

/// A flattened contract, ready for analysis and transformation
#[derive(Debug, Clone)]
pub struct IrContract {
    /// Target module name (snake_case)
    pub module_name: String,
    pub source_name: String,
    pub kind: ContractKind,
    pub state_vars: Vec<IrStateVar>,
    pub functions: Vec<IrFunction>,
    pub modifiers: Vec<IrModifier>,
    pub events: Vec<IrEvent>,
    pub structs: Vec<IrStruct>,
    pub enums: Vec<IrEnum>,
    pub error_codes: ErrorCodeTable,
    /// Other contracts this one references by name
    pub referenced_contracts: BTreeSet<String>,
    /// Qualified library members flattened into this contract:
    /// `"Lib.member"` (Source names) → flattened member name
    pub library_members: BTreeMap<String, String>,
}

impl IrContract {
    pub fn new(source_name: &str, module_name: &str, kind: ContractKind) -> Self {
        IrContract {
            module_name: module_name.to_string(),
            source_name: source_name.to_string(),
            kind,
            state_vars: Vec::new(),
            functions: Vec::new(),
            modifiers: Vec::new(),
            events: Vec::new(),
            structs: Vec::new(),
            enums: Vec::new(),
            error_codes: ErrorCodeTable::new(),
            referenced_contracts: BTreeSet::new(),
            library_members: BTreeMap::new(),
        }
    }

    pub fn state_var(&self, name: &str) -> Option<&IrStateVar> {
        self.state_vars.iter().find(|v| v.name == name)
    }

    /// Look up a state variable by its Source-side name
    pub fn state_var_by_source_name(&self, source_name: &str) -> Option<&IrStateVar> {
        self.state_vars.iter().find(|v| v.source_name == source_name)
    }

    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn modifier(&self, name: &str) -> Option<&IrModifier> {
        self.modifiers.iter().find(|m| m.name == name)
    }

    pub fn struct_def(&self, name: &str) -> Option<&IrStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&IrEnum> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn constructor(&self) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.is_constructor)
    }
}
