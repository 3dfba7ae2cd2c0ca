//! Read-only traversal helpers for Source bodies
//!
//! Several phases need to sweep whole function bodies (error-code
//! collection, write-pattern analysis, reference discovery). The closures
//! here keep those sweeps from re-implementing statement recursion each
//! time. All traversal is pre-order.

use crate::ast::source::{Block, Expr, ExprKind, Stmt, StmtKind};

/// Visit every statement in a block, including statements nested in
/// control-flow bodies
pub fn visit_stmts<'a>(block: &'a Block, f: &mut impl FnMut(&'a Stmt)) {
    for stmt in &block.stmts {
        visit_stmt(stmt, f);
    }
}

fn visit_stmt<'a>(stmt: &'a Stmt, f: &mut impl FnMut(&'a Stmt)) {
    f(stmt);
    match &stmt.kind {
        StmtKind::Block { body } | StmtKind::Unchecked { body } => visit_stmts(body, f),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            visit_stmts(then_branch, f);
            if let Some(else_branch) = else_branch {
                visit_stmts(else_branch, f);
            }
        }
        StmtKind::While { body, .. } => visit_stmts(body, f),
        StmtKind::For { init, body, .. } => {
            if let Some(init) = init {
                visit_stmt(init, f);
            }
            visit_stmts(body, f);
        }
        _ => {}
    }
}

/// Visit every expression inside one statement, without descending into
/// nested statements
pub fn visit_stmt_exprs<'a>(stmt: &'a Stmt, f: &mut impl FnMut(&'a Expr)) {
    match &stmt.kind {
        StmtKind::VarDecl { init: Some(init), .. } => visit_expr(init, f),
        StmtKind::Expr { expr } => visit_expr(expr, f),
        StmtKind::If { cond, .. } => visit_expr(cond, f),
        StmtKind::While { cond, .. } => visit_expr(cond, f),
        StmtKind::For { cond, update, .. } => {
            if let Some(cond) = cond {
                visit_expr(cond, f);
            }
            if let Some(update) = update {
                visit_expr(update, f);
            }
        }
        StmtKind::Return { values } => {
            for value in values {
                visit_expr(value, f);
            }
        }
        StmtKind::Emit { args, .. } | StmtKind::Revert { args, .. } => {
            for arg in args {
                visit_expr(arg, f);
            }
        }
        StmtKind::Require { cond, .. } => visit_expr(cond, f),
        _ => {}
    }
}

/// Visit an expression and all of its subexpressions
pub fn visit_expr<'a>(expr: &'a Expr, f: &mut impl FnMut(&'a Expr)) {
    f(expr);
    match &expr.kind {
        ExprKind::Binary { lhs, rhs, .. } => {
            visit_expr(lhs, f);
            visit_expr(rhs, f);
        }
        ExprKind::Unary { operand, .. } => visit_expr(operand, f),
        ExprKind::Assign { target, value, .. } => {
            visit_expr(target, f);
            visit_expr(value, f);
        }
        ExprKind::Index { base, index } => {
            visit_expr(base, f);
            visit_expr(index, f);
        }
        ExprKind::Member { base, .. } => visit_expr(base, f),
        ExprKind::Call { callee, args } => {
            visit_expr(callee, f);
            for arg in args {
                visit_expr(arg, f);
            }
        }
        ExprKind::Tuple { items } => {
            for item in items {
                visit_expr(item, f);
            }
        }
        ExprKind::Conditional {
            cond,
            then_value,
            else_value,
        } => {
            visit_expr(cond, f);
            visit_expr(then_value, f);
            visit_expr(else_value, f);
        }
        ExprKind::Cast { value, .. } => visit_expr(value, f),
        ExprKind::New { args, .. } => {
            for arg in args {
                visit_expr(arg, f);
            }
        }
        _ => {}
    }
}

/// Visit every expression anywhere inside a block
pub fn visit_block_exprs<'a>(block: &'a Block, f: &mut impl FnMut(&'a Expr)) {
    visit_stmts(block, &mut |stmt| visit_stmt_exprs(stmt, f));
}
