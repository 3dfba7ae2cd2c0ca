//! Target-side AST
//!
//! Data model for emitted Move modules. Nodes are built by the transformer
//! ([`crate::transform`]), annotated by the spec extractor
//! ([`crate::specgen`]) and rendered by the printer ([`crate::printer`]).
//!
//! Expressions carry an `inferred` type filled in by the expression
//! transformer as it constructs them. The field exists for exactly two
//! consumers: cast placement during operand harmonization and literal
//! suffix collapsing in the printer. Nothing else may branch on it.

pub mod walk;

use serde::Serialize;

/// Move's primitive and container types, as far as emission needs them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MoveType {
    U8,
    U16,
    U32,
    U64,
    U128,
    U256,
    Bool,
    Address,
    Signer,
    /// `std::string::String`
    String,
    Vector(Box<MoveType>),
    /// `aptos_std::table::Table<K, V>`
    Table(Box<MoveType>, Box<MoveType>),
    /// Module-local struct
    Struct(String),
    /// Struct from another module, e.g. `Object<Metadata>`
    External {
        module: String,
        name: String,
        type_args: Vec<MoveType>,
    },
    Ref {
        mutable: bool,
        inner: Box<MoveType>,
    },
}

impl MoveType {
    pub fn is_integer(&self) -> bool {
        self.width_bits().is_some()
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            MoveType::U8
                | MoveType::U16
                | MoveType::U32
                | MoveType::U64
                | MoveType::U128
                | MoveType::U256
                | MoveType::Bool
                | MoveType::Address
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, MoveType::Ref { .. })
    }

    /// Bit width for integer types, `None` otherwise
    pub fn width_bits(&self) -> Option<u16> {
        match self {
            MoveType::U8 => Some(8),
            MoveType::U16 => Some(16),
            MoveType::U32 => Some(32),
            MoveType::U64 => Some(64),
            MoveType::U128 => Some(128),
            MoveType::U256 => Some(256),
            _ => None,
        }
    }

    /// Integer type for a bit width, rounding up to the next Move width
    pub fn integer_of_width(bits: u16) -> MoveType {
        match bits {
            0..=8 => MoveType::U8,
            9..=16 => MoveType::U16,
            17..=32 => MoveType::U32,
            33..=64 => MoveType::U64,
            65..=128 => MoveType::U128,
            _ => MoveType::U256,
        }
    }

    /// Literal suffix for integer types (`u64`), used by the printer
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            MoveType::U8 => Some("u8"),
            MoveType::U16 => Some("u16"),
            MoveType::U32 => Some("u32"),
            MoveType::U64 => Some("u64"),
            MoveType::U128 => Some("u128"),
            MoveType::U256 => Some("u256"),
            _ => None,
        }
    }

    /// Strip one layer of reference
    pub fn dereferenced(&self) -> &MoveType {
        match self {
            MoveType::Ref { inner, .. } => inner,
            other => other,
        }
    }
}

/// Struct abilities; at most the four Move knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AbilitySet {
    pub copy_: bool,
    pub drop: bool,
    pub store: bool,
    pub key: bool,
}

impl AbilitySet {
    /// `has copy, drop, store` — plain data structs
    pub fn data() -> Self {
        AbilitySet {
            copy_: true,
            drop: true,
            store: true,
            key: false,
        }
    }

    /// `has key` — resource structs stored under an address
    pub fn resource() -> Self {
        AbilitySet {
            copy_: false,
            drop: false,
            store: false,
            key: true,
        }
    }

    /// `has drop, store` — event structs
    pub fn event() -> Self {
        AbilitySet {
            copy_: false,
            drop: true,
            store: true,
            key: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.copy_ || self.drop || self.store || self.key)
    }

    /// Ability names in Move's canonical order
    pub fn names(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.copy_ {
            out.push("copy");
        }
        if self.drop {
            out.push("drop");
        }
        if self.store {
            out.push("store");
        }
        if self.key {
            out.push("key");
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveField {
    pub name: String,
    pub ty: MoveType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveStructDef {
    pub name: String,
    pub abilities: AbilitySet,
    pub fields: Vec<MoveField>,
    /// Rendered with the `#[event]` attribute
    pub is_event: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstantDef {
    pub name: String,
    pub ty: MoveType,
    /// Literal text, already in Target syntax
    pub value: String,
    pub doc: Option<String>,
}

/// `use` declaration; `members` empty renders `use path;`, `Self` included
/// renders the braced form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UseDecl {
    pub path: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoveVisibility {
    Private,
    Public,
    Friend,
    Package,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveFunction {
    pub name: String,
    pub visibility: MoveVisibility,
    pub is_entry: bool,
    /// Rendered with the `#[view]` attribute
    pub is_view: bool,
    pub is_inline: bool,
    pub acquires: Vec<String>,
    pub params: Vec<(String, MoveType)>,
    pub returns: Vec<MoveType>,
    pub body: Vec<MoveStmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MoveStmt {
    Let {
        name: String,
        ty: Option<MoveType>,
        value: Option<MoveExpr>,
    },
    /// `let (a, b) = …;` for multi-valued calls
    LetTuple {
        names: Vec<String>,
        value: MoveExpr,
    },
    Assign {
        target: MoveExpr,
        value: MoveExpr,
    },
    Expr(MoveExpr),
    If {
        cond: MoveExpr,
        then_block: Vec<MoveStmt>,
        else_block: Option<Vec<MoveStmt>>,
    },
    While {
        cond: MoveExpr,
        body: Vec<MoveStmt>,
    },
    Return(Option<MoveExpr>),
    Abort(MoveExpr),
    Break,
    Continue,
    /// Construct with no Target lowering; renders as a marker comment
    Unsupported { pattern: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoveBinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    Xor,
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

impl MoveBinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            MoveBinOp::Add => "+",
            MoveBinOp::Sub => "-",
            MoveBinOp::Mul => "*",
            MoveBinOp::Div => "/",
            MoveBinOp::Mod => "%",
            MoveBinOp::BitAnd => "&",
            MoveBinOp::BitOr => "|",
            MoveBinOp::Xor => "^",
            MoveBinOp::Shl => "<<",
            MoveBinOp::Shr => ">>",
            MoveBinOp::And => "&&",
            MoveBinOp::Or => "||",
            MoveBinOp::Eq => "==",
            MoveBinOp::Ne => "!=",
            MoveBinOp::Lt => "<",
            MoveBinOp::Le => "<=",
            MoveBinOp::Gt => ">",
            MoveBinOp::Ge => ">=",
        }
    }

    /// Binding strength for parenthesization, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            MoveBinOp::Or => 1,
            MoveBinOp::And => 2,
            MoveBinOp::Eq | MoveBinOp::Ne | MoveBinOp::Lt | MoveBinOp::Le | MoveBinOp::Gt
            | MoveBinOp::Ge => 3,
            MoveBinOp::BitOr => 4,
            MoveBinOp::Xor => 5,
            MoveBinOp::BitAnd => 6,
            MoveBinOp::Shl | MoveBinOp::Shr => 7,
            MoveBinOp::Add | MoveBinOp::Sub => 8,
            MoveBinOp::Mul | MoveBinOp::Div | MoveBinOp::Mod => 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveExpr {
    pub kind: MoveExprKind,
    /// Concrete type the expression transformer inferred while building
    /// this node; consulted only for cast placement and literal suffixes
    pub inferred: Option<MoveType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MoveExprKind {
    /// Numeric literal: normalized decimal or `0x…` digits plus optional
    /// width suffix
    Literal {
        digits: String,
        suffix: Option<MoveType>,
    },
    BoolLit(bool),
    /// `@0xCAFE`; stored without the `@`
    AddressLit(String),
    /// `b"…"`
    ByteStringLit(String),
    Ident(String),
    Borrow {
        mutable: bool,
        expr: Box<MoveExpr>,
    },
    Deref(Box<MoveExpr>),
    Field {
        base: Box<MoveExpr>,
        field: String,
    },
    Call {
        /// `None` for local / builtin calls
        module: Option<String>,
        func: String,
        type_args: Vec<MoveType>,
        args: Vec<MoveExpr>,
    },
    BorrowGlobal {
        mutable: bool,
        ty: String,
        addr: Box<MoveExpr>,
    },
    Exists {
        ty: String,
        addr: Box<MoveExpr>,
    },
    Binary {
        op: MoveBinOp,
        lhs: Box<MoveExpr>,
        rhs: Box<MoveExpr>,
    },
    Not(Box<MoveExpr>),
    Cast {
        expr: Box<MoveExpr>,
        ty: MoveType,
    },
    Pack {
        name: String,
        fields: Vec<(String, MoveExpr)>,
    },
    VectorLit(Vec<MoveExpr>),
    Tuple(Vec<MoveExpr>),
    /// `if (cond) a else b` in expression position
    IfExpr {
        cond: Box<MoveExpr>,
        then_value: Box<MoveExpr>,
        else_value: Box<MoveExpr>,
    },
    /// Construct with no Target lowering; renders as a marker comment
    Unsupported { pattern: String },
}

impl MoveExpr {
    pub fn new(kind: MoveExprKind) -> Self {
        MoveExpr {
            kind,
            inferred: None,
        }
    }

    pub fn typed(kind: MoveExprKind, ty: MoveType) -> Self {
        MoveExpr {
            kind,
            inferred: Some(ty),
        }
    }

    pub fn ident(name: &str) -> Self {
        MoveExpr::new(MoveExprKind::Ident(name.to_string()))
    }

    pub fn ident_typed(name: &str, ty: MoveType) -> Self {
        MoveExpr::typed(MoveExprKind::Ident(name.to_string()), ty)
    }

    pub fn literal(digits: &str, ty: MoveType) -> Self {
        MoveExpr::typed(
            MoveExprKind::Literal {
                digits: digits.to_string(),
                suffix: None,
            },
            ty,
        )
    }

    pub fn bool_lit(value: bool) -> Self {
        MoveExpr::typed(MoveExprKind::BoolLit(value), MoveType::Bool)
    }

    pub fn address_lit(addr: &str) -> Self {
        MoveExpr::typed(
            MoveExprKind::AddressLit(addr.trim_start_matches('@').to_string()),
            MoveType::Address,
        )
    }

    pub fn field(base: MoveExpr, field: &str) -> Self {
        MoveExpr::new(MoveExprKind::Field {
            base: Box::new(base),
            field: field.to_string(),
        })
    }

    pub fn field_typed(base: MoveExpr, field: &str, ty: MoveType) -> Self {
        MoveExpr::typed(
            MoveExprKind::Field {
                base: Box::new(base),
                field: field.to_string(),
            },
            ty,
        )
    }

    pub fn call(module: Option<&str>, func: &str, args: Vec<MoveExpr>) -> Self {
        MoveExpr::new(MoveExprKind::Call {
            module: module.map(|m| m.to_string()),
            func: func.to_string(),
            type_args: Vec::new(),
            args,
        })
    }

    pub fn borrow(mutable: bool, expr: MoveExpr) -> Self {
        MoveExpr::new(MoveExprKind::Borrow {
            mutable,
            expr: Box::new(expr),
        })
    }

    pub fn deref(expr: MoveExpr) -> Self {
        MoveExpr::new(MoveExprKind::Deref(Box::new(expr)))
    }

    pub fn binary(op: MoveBinOp, lhs: MoveExpr, rhs: MoveExpr) -> Self {
        MoveExpr::new(MoveExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn with_type(mut self, ty: MoveType) -> Self {
        self.inferred = Some(ty);
        self
    }
}

/// Where a specification block attaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpecTargetKind {
    Module,
    Function,
    Struct,
}

/// `aborts_if` condition, optionally `with` an abort code constant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbortsIf {
    pub cond: String,
    pub code: Option<String>,
}

/// One `spec` block; conditions are stored pre-rendered in Target syntax
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecBlock {
    pub target: String,
    pub kind: SpecTargetKind,
    pub pragmas: Vec<String>,
    pub requires: Vec<String>,
    pub ensures: Vec<String>,
    pub aborts_if: Vec<AbortsIf>,
    pub modifies: Vec<String>,
    pub invariants: Vec<String>,
}

impl SpecBlock {
    pub fn new(target: &str, kind: SpecTargetKind) -> Self {
        SpecBlock {
            target: target.to_string(),
            kind,
            pragmas: Vec::new(),
            requires: Vec::new(),
            ensures: Vec::new(),
            aborts_if: Vec::new(),
            modifies: Vec::new(),
            invariants: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pragmas.is_empty()
            && self.requires.is_empty()
            && self.ensures.is_empty()
            && self.aborts_if.is_empty()
            && self.modifies.is_empty()
            && self.invariants.is_empty()
    }
}

/// One emitted Move module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveModule {
    /// Address identifier or literal printed in the header
    pub address: String,
    pub name: String,
    pub uses: Vec<UseDecl>,
    pub friends: Vec<String>,
    pub constants: Vec<ConstantDef>,
    pub structs: Vec<MoveStructDef>,
    pub functions: Vec<MoveFunction>,
    pub specs: Vec<SpecBlock>,
}

impl MoveModule {
    pub fn new(address: &str, name: &str) -> Self {
        MoveModule {
            address: address.to_string(),
            name: name.to_string(),
            uses: Vec::new(),
            friends: Vec::new(),
            constants: Vec::new(),
            structs: Vec::new(),
            functions: Vec::new(),
            specs: Vec::new(),
        }
    }

    /// Register a `use`, keeping the list sorted and free of duplicates
    pub fn add_use(&mut self, path: &str, members: &[&str]) {
        let decl = UseDecl {
            path: path.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        };
        if !self.uses.contains(&decl) {
            self.uses.push(decl);
            self.uses.sort();
        }
    }

    pub fn find_struct(&self, name: &str) -> Option<&MoveStructDef> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn find_function(&self, name: &str) -> Option<&MoveFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}
