//! Shared Source-AST construction helpers for the integration suites
//!
//! Tests build Source units programmatically (the external parser is out
//! of scope); these helpers keep the scenarios readable.

#![allow(dead_code)]

use sol2move::ast::source::{
    AssignOp, BinaryOp, Block, ContractDef, ContractKind, Expr, ExprKind, FnMutability,
    FunctionDef, ModifierDef, ModifierInvocation, Param, SourceType, SourceUnit, StateVarDecl,
    Stmt, StmtKind, UnaryOp, VarMutability, Visibility,
};
use sol2move::ast::Span;

pub fn ty(text: &str) -> SourceType {
    SourceType::parse(text).expect("test type parses")
}

pub fn ident(name: &str) -> Expr {
    Expr::ident(name)
}

pub fn num(value: &str) -> Expr {
    Expr::number(value)
}

pub fn msg_sender() -> Expr {
    Expr::member(Expr::ident("msg"), "sender")
}

pub fn member(base: Expr, field: &str) -> Expr {
    Expr::member(base, field)
}

pub fn index(base: Expr, key: Expr) -> Expr {
    Expr::new(ExprKind::Index {
        base: Box::new(base),
        index: Box::new(key),
    })
}

pub fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::new(ExprKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn cast(target: &str, value: Expr) -> Expr {
    Expr::new(ExprKind::Cast {
        ty: ty(target),
        value: Box::new(value),
    })
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        callee: Box::new(callee),
        args,
    })
}

pub fn assign(target: Expr, value: Expr) -> Stmt {
    assign_op(AssignOp::Assign, target, value)
}

pub fn add_assign(target: Expr, value: Expr) -> Stmt {
    assign_op(AssignOp::AddAssign, target, value)
}

pub fn sub_assign(target: Expr, value: Expr) -> Stmt {
    assign_op(AssignOp::SubAssign, target, value)
}

pub fn assign_op(op: AssignOp, target: Expr, value: Expr) -> Stmt {
    expr_stmt(Expr::new(ExprKind::Assign {
        op,
        target: Box::new(target),
        value: Box::new(value),
    }))
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::new(StmtKind::Expr { expr })
}

pub fn require(cond: Expr, message: Option<&str>) -> Stmt {
    Stmt::new(StmtKind::Require {
        cond,
        message: message.map(|m| m.to_string()),
    })
}

pub fn ret(values: Vec<Expr>) -> Stmt {
    Stmt::new(StmtKind::Return { values })
}

pub fn var_decl(name: &str, var_ty: &str, init: Option<Expr>) -> Stmt {
    Stmt::new(StmtKind::VarDecl {
        names: vec![name.to_string()],
        types: vec![ty(var_ty)],
        init,
    })
}

pub fn if_stmt(cond: Expr, then_stmts: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::If {
        cond,
        then_branch: block(then_stmts),
        else_branch: None,
    })
}

pub fn placeholder() -> Stmt {
    Stmt::new(StmtKind::Placeholder)
}

pub fn block(stmts: Vec<Stmt>) -> Block {
    Block {
        stmts,
        span: Span::none(),
    }
}

pub fn param(name: &str, param_ty: &str) -> Param {
    Param {
        name: name.to_string(),
        ty: ty(param_ty),
    }
}

pub fn state_var(name: &str, var_ty: &str) -> StateVarDecl {
    StateVarDecl {
        name: name.to_string(),
        ty: ty(var_ty),
        mutability: VarMutability::Mutable,
        visibility: Visibility::Internal,
        initial: None,
        span: Span::none(),
    }
}

pub fn immutable_var(name: &str, var_ty: &str) -> StateVarDecl {
    StateVarDecl {
        mutability: VarMutability::Immutable,
        ..state_var(name, var_ty)
    }
}

pub fn function(
    name: &str,
    visibility: Visibility,
    mutability: FnMutability,
    params: Vec<Param>,
    returns: Vec<Param>,
    body: Vec<Stmt>,
) -> FunctionDef {
    FunctionDef {
        name: name.to_string(),
        is_constructor: false,
        visibility,
        mutability,
        modifiers: Vec::new(),
        params,
        returns,
        body: Some(block(body)),
        span: Span::none(),
    }
}

pub fn public_fn(name: &str, params: Vec<Param>, body: Vec<Stmt>) -> FunctionDef {
    function(
        name,
        Visibility::Public,
        FnMutability::Nonpayable,
        params,
        Vec::new(),
        body,
    )
}

pub fn view_fn(name: &str, params: Vec<Param>, returns: Vec<Param>, body: Vec<Stmt>) -> FunctionDef {
    function(
        name,
        Visibility::Public,
        FnMutability::View,
        params,
        returns,
        body,
    )
}

pub fn constructor(params: Vec<Param>, body: Vec<Stmt>) -> FunctionDef {
    FunctionDef {
        is_constructor: true,
        ..function(
            "constructor",
            Visibility::Public,
            FnMutability::Nonpayable,
            params,
            Vec::new(),
            body,
        )
    }
}

pub fn with_modifiers(mut function: FunctionDef, names: &[&str]) -> FunctionDef {
    function.modifiers = names
        .iter()
        .map(|name| ModifierInvocation {
            name: name.to_string(),
            args: Vec::new(),
        })
        .collect();
    function
}

pub fn modifier(name: &str, body: Vec<Stmt>) -> ModifierDef {
    ModifierDef {
        name: name.to_string(),
        params: Vec::new(),
        body: block(body),
        span: Span::none(),
    }
}

/// The classic access-control modifier: `require(msg.sender == owner)`
pub fn only_owner_modifier(owner_var: &str) -> ModifierDef {
    modifier(
        "onlyOwner",
        vec![
            require(
                bin(BinaryOp::Eq, msg_sender(), ident(owner_var)),
                Some("caller is not the owner"),
            ),
            placeholder(),
        ],
    )
}

pub fn contract(name: &str, vars: Vec<StateVarDecl>, functions: Vec<FunctionDef>) -> ContractDef {
    ContractDef {
        name: name.to_string(),
        kind: ContractKind::Contract,
        bases: Vec::new(),
        state_vars: vars,
        functions,
        modifiers: Vec::new(),
        events: Vec::new(),
        errors: Vec::new(),
        structs: Vec::new(),
        enums: Vec::new(),
        span: Span::none(),
    }
}

pub fn unit(contracts: Vec<ContractDef>) -> SourceUnit {
    SourceUnit { contracts }
}

/// Scenario fixture: a counter with increment / decrement / getCount
pub fn counter_unit() -> SourceUnit {
    let increment = public_fn(
        "increment",
        Vec::new(),
        vec![add_assign(ident("count"), num("1"))],
    );
    let decrement = public_fn(
        "decrement",
        Vec::new(),
        vec![sub_assign(ident("count"), num("1"))],
    );
    let get_count = view_fn(
        "getCount",
        Vec::new(),
        vec![param("", "uint256")],
        vec![ret(vec![ident("count")])],
    );
    unit(vec![contract(
        "Counter",
        vec![state_var("count", "uint256")],
        vec![increment, decrement, get_count],
    )])
}

/// The emitted source text of a module, by name
pub fn module_source<'a>(
    output: &'a sol2move::TranspileOutput,
    name: &str,
) -> &'a str {
    &output
        .modules
        .iter()
        .find(|m| m.name == name)
        .unwrap_or_else(|| panic!("module `{}` not emitted", name))
        .source
}
