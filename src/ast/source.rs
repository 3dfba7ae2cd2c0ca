//! Source AST data model
//!
//! The input side of the pipeline: contracts, functions, statements and
//! expressions of the C-family contract language. The external parser
//! produces these nodes as tagged JSON records (`"kind"` discriminator);
//! this module is the serde image of that contract.
//!
//! Two rules hold everywhere:
//!
//! - Nodes are immutable once deserialized. The core reads them, it never
//!   rewrites them.
//! - Every node carries a [`Span`] for diagnostics. Synthesized test nodes
//!   use `Span::none()`.
//!
//! Types are serialized in their Source surface syntax (`"uint256"`,
//! `"mapping(address => uint256)"`, `"uint8[4]"`) and parsed by
//! [`SourceType::parse`]; a full type-AST on the wire would force every
//! frontend to agree on a second schema for no benefit.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ast::span::Span;

/// A parsed compilation unit: every contract the external parser found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    #[serde(default)]
    pub contracts: Vec<ContractDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    Contract,
    Interface,
    Library,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDef {
    pub name: String,
    pub kind: ContractKind,
    /// Declared base contracts, most-derived-first as written in Source
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub state_vars: Vec<StateVarDecl>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
    #[serde(default)]
    pub modifiers: Vec<ModifierDef>,
    #[serde(default)]
    pub events: Vec<EventDef>,
    #[serde(default)]
    pub errors: Vec<ErrorDef>,
    #[serde(default)]
    pub structs: Vec<StructDef>,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Internal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FnMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

impl Default for FnMutability {
    fn default() -> Self {
        FnMutability::Nonpayable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMutability {
    Mutable,
    Constant,
    Immutable,
}

impl Default for VarMutability {
    fn default() -> Self {
        VarMutability::Mutable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVarDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SourceType,
    #[serde(default)]
    pub mutability: VarMutability,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub initial: Option<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Empty for unnamed return values
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SourceType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub is_constructor: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub mutability: FnMutability,
    #[serde(default)]
    pub modifiers: Vec<ModifierInvocation>,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub returns: Vec<Param>,
    /// Absent for unimplemented (interface/abstract) functions
    #[serde(default)]
    pub body: Option<Block>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierInvocation {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    pub body: Block,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventParam {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SourceType,
    #[serde(default)]
    pub indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<EventParam>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Param>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    #[serde(default)]
    pub variants: Vec<String>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub stmts: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    #[serde(flatten)]
    pub kind: StmtKind,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StmtKind {
    Block {
        body: Block,
    },
    VarDecl {
        names: Vec<String>,
        types: Vec<SourceType>,
        #[serde(default)]
        init: Option<Expr>,
    },
    Expr {
        expr: Expr,
    },
    If {
        cond: Expr,
        then_branch: Block,
        #[serde(default)]
        else_branch: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    For {
        #[serde(default)]
        init: Option<Box<Stmt>>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        update: Option<Expr>,
        body: Block,
    },
    Return {
        #[serde(default)]
        values: Vec<Expr>,
    },
    Emit {
        event: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Require {
        cond: Expr,
        #[serde(default)]
        message: Option<String>,
    },
    Revert {
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Unchecked {
        body: Block,
    },
    Break,
    Continue,
    /// The `_;` placeholder inside modifier bodies
    Placeholder,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Stmt {
            kind,
            span: Span::none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExprKind {
    Ident {
        name: String,
    },
    /// Decimal, hex (`0x…`) or scientific (`1e18`) literal, as written
    Number {
        value: String,
    },
    Bool {
        value: bool,
    },
    Str {
        value: String,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        base: Box<Expr>,
        member: String,
    },
    Call {
        callee: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Tuple {
        items: Vec<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    Cast {
        #[serde(rename = "type")]
        ty: SourceType,
        value: Box<Expr>,
    },
    New {
        #[serde(rename = "type")]
        ty: SourceType,
        #[serde(default)]
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Operators whose operands must be harmonized to one integer width
    pub fn needs_harmonization(&self) -> bool {
        !matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    BitNot,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl AssignOp {
    /// The binary operator a compound assignment desugars to
    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::ModAssign => Some(BinaryOp::Mod),
        }
    }
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            span: Span::none(),
        }
    }

    pub fn ident(name: &str) -> Self {
        Expr::new(ExprKind::Ident {
            name: name.to_string(),
        })
    }

    pub fn number(value: &str) -> Self {
        Expr::new(ExprKind::Number {
            value: value.to_string(),
        })
    }

    pub fn member(base: Expr, member: &str) -> Self {
        Expr::new(ExprKind::Member {
            base: Box::new(base),
            member: member.to_string(),
        })
    }

    /// True for the `msg.sender` environment access
    pub fn is_msg_sender(&self) -> bool {
        match &self.kind {
            ExprKind::Member { base, member } => {
                member == "sender"
                    && matches!(&base.kind, ExprKind::Ident { name } if name == "msg")
            }
            _ => false,
        }
    }
}

// =============================================================================
// Source types
// =============================================================================

/// The Source type lattice
///
/// Deserialized from surface syntax; see [`SourceType::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceType {
    /// `uintN`; N is the bit width (8..=256 in steps of 8)
    Uint(u16),
    /// `intN`
    Int(u16),
    Bool,
    Address,
    AddressPayable,
    Str,
    Bytes,
    /// `bytesN` for N in 1..=32
    FixedBytes(u8),
    Mapping(Box<SourceType>, Box<SourceType>),
    /// `T[]` or `T[n]`
    Array(Box<SourceType>, Option<u64>),
    /// Struct, enum or contract reference
    Named(String),
}

/// Error produced when a type string does not parse
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParseError {
    pub input: String,
    pub reason: String,
}

impl std::fmt::Display for TypeParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid type `{}`: {}", self.input, self.reason)
    }
}

impl std::error::Error for TypeParseError {}

impl SourceType {
    pub fn uint256() -> Self {
        SourceType::Uint(256)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, SourceType::Uint(_) | SourceType::Int(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, SourceType::Mapping(_, _))
    }

    /// Mapping keyed by an account address at the outermost level
    pub fn is_address_keyed_mapping(&self) -> bool {
        matches!(
            self,
            SourceType::Mapping(key, _)
                if matches!(**key, SourceType::Address | SourceType::AddressPayable)
        )
    }

    /// Parse the Source surface syntax for types
    ///
    /// Handles elementary types, `mapping(K => V)` nesting and array
    /// suffixes. Unknown identifiers become [`SourceType::Named`].
    pub fn parse(input: &str) -> Result<SourceType, TypeParseError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(TypeParseError {
                input: input.to_string(),
                reason: "empty type".to_string(),
            });
        }

        // Array suffixes bind last: `mapping(...)[]` is an array of mappings.
        if let Some(open) = find_trailing_array_bracket(text) {
            let elem = SourceType::parse(&text[..open])?;
            let len_text = text[open + 1..text.len() - 1].trim();
            let len = if len_text.is_empty() {
                None
            } else {
                Some(len_text.parse::<u64>().map_err(|_| TypeParseError {
                    input: input.to_string(),
                    reason: format!("bad array length `{}`", len_text),
                })?)
            };
            return Ok(SourceType::Array(Box::new(elem), len));
        }

        if let Some(inner) = text.strip_prefix("mapping(").and_then(|t| t.strip_suffix(')')) {
            let arrow = find_top_level_arrow(inner).ok_or_else(|| TypeParseError {
                input: input.to_string(),
                reason: "mapping without `=>`".to_string(),
            })?;
            let key = SourceType::parse(&inner[..arrow])?;
            let value = SourceType::parse(&inner[arrow + 2..])?;
            return Ok(SourceType::Mapping(Box::new(key), Box::new(value)));
        }

        match text {
            "bool" => return Ok(SourceType::Bool),
            "address" => return Ok(SourceType::Address),
            "address payable" => return Ok(SourceType::AddressPayable),
            "string" => return Ok(SourceType::Str),
            "bytes" => return Ok(SourceType::Bytes),
            "uint" => return Ok(SourceType::Uint(256)),
            "int" => return Ok(SourceType::Int(256)),
            _ => {}
        }

        if let Some(width) = text.strip_prefix("uint") {
            if let Ok(bits) = width.parse::<u16>() {
                return check_int_width(bits, input).map(SourceType::Uint);
            }
        }
        if let Some(width) = text.strip_prefix("int") {
            if let Ok(bits) = width.parse::<u16>() {
                return check_int_width(bits, input).map(SourceType::Int);
            }
        }
        if let Some(width) = text.strip_prefix("bytes") {
            if let Ok(n) = width.parse::<u8>() {
                if (1..=32).contains(&n) {
                    return Ok(SourceType::FixedBytes(n));
                }
                return Err(TypeParseError {
                    input: input.to_string(),
                    reason: format!("bytes{} out of range", n),
                });
            }
        }

        if text.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$')
            && text.chars().next().map(|c| !c.is_numeric()).unwrap_or(false)
        {
            return Ok(SourceType::Named(text.to_string()));
        }

        Err(TypeParseError {
            input: input.to_string(),
            reason: "unrecognized type syntax".to_string(),
        })
    }
}

fn check_int_width(bits: u16, input: &str) -> Result<u16, TypeParseError> {
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        Err(TypeParseError {
            input: input.to_string(),
            reason: format!("integer width {} not a multiple of 8 in 8..=256", bits),
        })
    } else {
        Ok(bits)
    }
}

/// Index of the `[` of a trailing array suffix, if the whole text ends with
/// one at bracket depth zero
fn find_trailing_array_bracket(text: &str) -> Option<usize> {
    if !text.ends_with(']') {
        return None;
    }
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b']' => depth += 1,
            b'[' => {
                depth -= 1;
                if depth == 0 {
                    // Must be a suffix, not the whole text.
                    return if i > 0 { Some(i) } else { None };
                }
            }
            _ => {}
        }
    }
    None
}

/// Index of the `=>` separating key and value at paren depth zero
fn find_top_level_arrow(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;
    while i + 1 < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            b'=' if depth == 0 && bytes[i + 1] == b'>' => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Uint(bits) => write!(f, "uint{}", bits),
            SourceType::Int(bits) => write!(f, "int{}", bits),
            SourceType::Bool => write!(f, "bool"),
            SourceType::Address => write!(f, "address"),
            SourceType::AddressPayable => write!(f, "address payable"),
            SourceType::Str => write!(f, "string"),
            SourceType::Bytes => write!(f, "bytes"),
            SourceType::FixedBytes(n) => write!(f, "bytes{}", n),
            SourceType::Mapping(key, value) => write!(f, "mapping({} => {})", key, value),
            SourceType::Array(elem, Some(len)) => write!(f, "{}[{}]", elem, len),
            SourceType::Array(elem, None) => write!(f, "{}[]", elem),
            SourceType::Named(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for SourceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SourceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        SourceType::parse(&text).map_err(serde::de::Error::custom)
    }
}
