//! Read-only traversal helpers for the Target AST
//!
//! Used by the spec extractor, the runtime-shim reference detector and the
//! printer's receiver-style rewriting checks. Pre-order, like the Source
//! side walkers.

use crate::move_ast::{MoveExpr, MoveExprKind, MoveFunction, MoveModule, MoveStmt};

/// Visit every statement in a body, including nested control-flow blocks
pub fn visit_stmts<'a>(body: &'a [MoveStmt], f: &mut impl FnMut(&'a MoveStmt)) {
    for stmt in body {
        f(stmt);
        match stmt {
            MoveStmt::If {
                then_block,
                else_block,
                ..
            } => {
                visit_stmts(then_block, f);
                if let Some(else_block) = else_block {
                    visit_stmts(else_block, f);
                }
            }
            MoveStmt::While { body, .. } => visit_stmts(body, f),
            _ => {}
        }
    }
}

/// Visit every expression in one statement, recursively
pub fn visit_stmt_exprs<'a>(stmt: &'a MoveStmt, f: &mut impl FnMut(&'a MoveExpr)) {
    match stmt {
        MoveStmt::Let {
            value: Some(value), ..
        } => visit_expr(value, f),
        MoveStmt::LetTuple { value, .. } => visit_expr(value, f),
        MoveStmt::Assign { target, value } => {
            visit_expr(target, f);
            visit_expr(value, f);
        }
        MoveStmt::Expr(expr) => visit_expr(expr, f),
        MoveStmt::If { cond, .. } => visit_expr(cond, f),
        MoveStmt::While { cond, .. } => visit_expr(cond, f),
        MoveStmt::Return(Some(expr)) => visit_expr(expr, f),
        MoveStmt::Abort(expr) => visit_expr(expr, f),
        _ => {}
    }
}

/// Visit an expression and all of its subexpressions
pub fn visit_expr<'a>(expr: &'a MoveExpr, f: &mut impl FnMut(&'a MoveExpr)) {
    f(expr);
    match &expr.kind {
        MoveExprKind::Borrow { expr: inner, .. } | MoveExprKind::Deref(inner) => {
            visit_expr(inner, f)
        }
        MoveExprKind::Field { base, .. } => visit_expr(base, f),
        MoveExprKind::Call { args, .. } => {
            for arg in args {
                visit_expr(arg, f);
            }
        }
        MoveExprKind::BorrowGlobal { addr, .. } | MoveExprKind::Exists { addr, .. } => {
            visit_expr(addr, f)
        }
        MoveExprKind::Binary { lhs, rhs, .. } => {
            visit_expr(lhs, f);
            visit_expr(rhs, f);
        }
        MoveExprKind::Not(inner) => visit_expr(inner, f),
        MoveExprKind::Cast { expr: inner, .. } => visit_expr(inner, f),
        MoveExprKind::Pack { fields, .. } => {
            for (_, value) in fields {
                visit_expr(value, f);
            }
        }
        MoveExprKind::VectorLit(items) | MoveExprKind::Tuple(items) => {
            for item in items {
                visit_expr(item, f);
            }
        }
        MoveExprKind::IfExpr {
            cond,
            then_value,
            else_value,
        } => {
            visit_expr(cond, f);
            visit_expr(then_value, f);
            visit_expr(else_value, f);
        }
        _ => {}
    }
}

/// Visit every expression in a function body
pub fn visit_function_exprs<'a>(function: &'a MoveFunction, f: &mut impl FnMut(&'a MoveExpr)) {
    visit_stmts(&function.body, &mut |stmt| visit_stmt_exprs(stmt, f));
}

/// Visit every expression anywhere in a module
pub fn visit_module_exprs<'a>(module: &'a MoveModule, f: &mut impl FnMut(&'a MoveExpr)) {
    for function in &module.functions {
        visit_function_exprs(function, f);
    }
}
