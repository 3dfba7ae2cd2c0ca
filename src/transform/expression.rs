//! Expression transformation
//!
//! Recursive, bottom-up Source-expression → Target-expression translation.
//! Every transformed node carries its inferred concrete type, and every
//! transformation may yield *pre-statements* that the enclosing statement
//! must execute first (container initialization for nested writes,
//! existence checks for borrows, hoisted inner assignments).
//!
//! The rules that do the heavy lifting:
//!
//! - operand harmonization: both sides of an arithmetic or comparison
//!   operator are widened to one integer width, untyped literals adopt the
//!   other side's width;
//! - `~x` lowers to `x ^ MASK` because the Target has no bitwise not;
//! - casts to bool lower to `!= 0` because the Target forbids them;
//! - collection access lowers to table borrows with scalar defaults, and
//!   copies out of table entries are recorded as table-copy origins for
//!   later write-back.

use crate::ast::source::{AssignOp, BinaryOp, Expr, ExprKind, SourceType, UnaryOp};
use crate::ast::Span;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::ir::IrStateVar;
use crate::lift::naming;
use crate::move_ast::{MoveBinOp, MoveExpr, MoveExprKind, MoveStmt, MoveType};
use crate::transform::{lower_type, FunctionCtx, PER_USER_FIELD};

/// A transformed expression plus the statements that must run before it
#[derive(Debug)]
pub struct ExprResult {
    pub expr: MoveExpr,
    pub pre: Vec<MoveStmt>,
}

impl ExprResult {
    fn plain(expr: MoveExpr) -> Self {
        ExprResult {
            expr,
            pre: Vec::new(),
        }
    }

    fn unsupported(pattern: &str) -> Self {
        ExprResult::plain(MoveExpr::new(MoveExprKind::Unsupported {
            pattern: pattern.to_string(),
        }))
    }
}

/// Origin information for a let-binding that copied a value out of a
/// state table entry
#[derive(Debug)]
pub struct TableCopyCapture {
    /// The table field expression, e.g. `state.pools`
    pub table: MoveExpr,
    /// Translated keys, outermost first
    pub keys: Vec<MoveExpr>,
    /// Resource group holding the table
    pub group: String,
}

/// All-ones mask for each integer width, used to lower bitwise not
fn not_mask(ty: &MoveType) -> Option<&'static str> {
    match ty {
        MoveType::U8 => Some("0xff"),
        MoveType::U16 => Some("0xffff"),
        MoveType::U32 => Some("0xffffffff"),
        MoveType::U64 => Some("0xffffffffffffffff"),
        MoveType::U128 => Some("0xffffffffffffffffffffffffffffffff"),
        MoveType::U256 => {
            Some("0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff")
        }
        _ => None,
    }
}

pub struct ExpressionTransformer<'c, 'm, 'a> {
    ctx: &'c mut FunctionCtx<'m, 'a>,
}

impl<'c, 'm, 'a> ExpressionTransformer<'c, 'm, 'a> {
    pub fn new(ctx: &'c mut FunctionCtx<'m, 'a>) -> Self {
        ExpressionTransformer { ctx }
    }

    /// Transform an expression bottom-up
    pub fn transform(&mut self, expr: &Expr) -> ExprResult {
        match &expr.kind {
            ExprKind::Number { value } => ExprResult::plain(MoveExpr::new(MoveExprKind::Literal {
                digits: value.clone(),
                suffix: None,
            })),
            ExprKind::Bool { value } => ExprResult::plain(MoveExpr::bool_lit(*value)),
            ExprKind::Str { value } => {
                self.ctx.require_use("string");
                ExprResult::plain(
                    MoveExpr::call(
                        Some("string"),
                        "utf8",
                        vec![MoveExpr::new(MoveExprKind::ByteStringLit(value.clone()))],
                    )
                    .with_type(MoveType::String),
                )
            }
            ExprKind::Ident { name } => self.transform_ident(name, expr.span),
            ExprKind::Member { base, member } => self.transform_member(base, member, expr.span),
            ExprKind::Index { .. } => self.transform_index_read(expr),
            ExprKind::Binary { op, lhs, rhs } => self.transform_binary(*op, lhs, rhs, expr.span),
            ExprKind::Unary { op, operand } => self.transform_unary(*op, operand, expr.span),
            ExprKind::Assign { op, target, value } => {
                // Nested assignment: hoist it into a pre-statement and
                // evaluate to a re-read of the target.
                let mut pre = self.lower_assignment(*op, target, value, expr.span);
                let read = self.transform(target);
                pre.extend(read.pre);
                ExprResult {
                    expr: read.expr,
                    pre,
                }
            }
            ExprKind::Call { callee, args } => self.transform_call(callee, args, expr.span),
            ExprKind::Tuple { items } => {
                let mut pre = Vec::new();
                let mut lowered = Vec::new();
                for item in items {
                    let mut result = self.transform(item);
                    pre.append(&mut result.pre);
                    lowered.push(result.expr);
                }
                ExprResult {
                    expr: MoveExpr::new(MoveExprKind::Tuple(lowered)),
                    pre,
                }
            }
            ExprKind::Conditional {
                cond,
                then_value,
                else_value,
            } => {
                let mut cond_result = self.transform(cond);
                let then_result = self.transform(then_value);
                let else_result = self.transform(else_value);
                let (then_expr, else_expr, ty) = self.harmonize_pair(
                    then_result.expr,
                    else_result.expr,
                    expr.span,
                    "conditional arms",
                );
                cond_result.pre.extend(then_result.pre);
                cond_result.pre.extend(else_result.pre);
                let mut out = MoveExpr::new(MoveExprKind::IfExpr {
                    cond: Box::new(cond_result.expr),
                    then_value: Box::new(then_expr),
                    else_value: Box::new(else_expr),
                });
                out.inferred = ty;
                ExprResult {
                    expr: out,
                    pre: cond_result.pre,
                }
            }
            ExprKind::Cast { ty, value } => self.transform_cast(ty, value, expr.span),
            ExprKind::New { ty, .. } => {
                self.report_unsupported(&format!("new {}", ty), expr.span);
                ExprResult::unsupported(&format!("new {}", ty))
            }
        }
    }

    /// Transform a let-binding initializer. When the initializer copies a
    /// value out of a state table entry, also return the
    /// [`TableCopyCapture`] so the caller can record it for write-back.
    pub fn transform_binding_init(
        &mut self,
        init: &Expr,
    ) -> (ExprResult, Option<TableCopyCapture>) {
        if let ExprKind::Index { .. } = &init.kind {
            let (root, keys) = Self::index_chain(init);
            if let ExprKind::Ident { name } = &root.kind {
                if !self.ctx.locals.contains_key(name) {
                    if let Some(var) = self
                        .ctx
                        .module
                        .contract
                        .state_var_by_source_name(name)
                        .cloned()
                    {
                        if var.ty.is_mapping() {
                            return self.read_state_table(&var, &keys, init.span, true);
                        }
                    }
                }
            }
        }
        (self.transform(init), None)
    }

    /// Transform and coerce toward an expected type: untyped literals adopt
    /// it, mismatched integer widths get an explicit cast
    pub fn transform_expecting(&mut self, expr: &Expr, expected: Option<&MoveType>) -> ExprResult {
        let mut result = self.transform(expr);
        if let Some(expected) = expected {
            result.expr = self.coerce(result.expr, expected);
        }
        result
    }

    /// Coerce an already-transformed expression toward an expected type
    pub fn coerce(&mut self, expr: MoveExpr, expected: &MoveType) -> MoveExpr {
        if expr.inferred.as_ref() == Some(expected) {
            return expr;
        }
        match expr.inferred.clone() {
            // Untyped literal: annotation is enough, the printer prints
            // bare digits and the Target infers.
            None if matches!(expr.kind, MoveExprKind::Literal { .. })
                && expected.is_integer() =>
            {
                expr.with_type(expected.clone())
            }
            Some(actual) if actual.is_integer() && expected.is_integer() => {
                self.cast_to(expr, expected.clone())
            }
            _ => expr,
        }
    }

    /// Insert a cast, collapsing `(x as T) as T` to a single cast.
    /// Casts through a *different* intermediate type are both kept so the
    /// truncation they encode survives.
    fn cast_to(&mut self, expr: MoveExpr, target: MoveType) -> MoveExpr {
        if let MoveExprKind::Cast { ty, .. } = &expr.kind {
            if *ty == target {
                return expr.with_type(target);
            }
        }
        MoveExpr::typed(
            MoveExprKind::Cast {
                expr: Box::new(expr),
                ty: target.clone(),
            },
            target,
        )
    }

    // -------------------------------------------------------------------
    // Identifiers and members
    // -------------------------------------------------------------------

    fn transform_ident(&mut self, name: &str, span: Span) -> ExprResult {
        // Resolution order: locals and parameters, then state variables,
        // then module constants, then the module itself.
        if let Some(ty) = self.ctx.locals.get(name).cloned() {
            return ExprResult::plain(MoveExpr::ident_typed(&naming::member_name(name), ty));
        }

        if let Some(var) = self
            .ctx
            .module
            .contract
            .state_var_by_source_name(name)
            .cloned()
        {
            return self.transform_state_read(&var, span);
        }

        if name == "this" {
            return ExprResult::plain(self.ctx.module_address_expr());
        }

        self.ctx.diagnostics.push(
            Diagnostic::error(
                DiagnosticKind::UnresolvedSymbol,
                format!("no visible declaration provides `{}`", name),
            )
            .with_span(span)
            .in_contract(&self.ctx.module.contract.source_name),
        );
        ExprResult::unsupported(&format!("unresolved `{}`", name))
    }

    fn transform_state_read(&mut self, var: &IrStateVar, span: Span) -> ExprResult {
        use crate::ast::VarMutability;

        if var.mutability == VarMutability::Constant {
            let ty = lower_type(&var.ty, self.ctx.module.contract);
            return ExprResult::plain(MoveExpr::ident_typed(&var.name, ty));
        }

        match self.ctx.state_field(var, false) {
            Some(expr) => ExprResult::plain(expr),
            None => {
                // Per-user resource: the bare mapping has no module-level
                // representation, only keyed reads do.
                self.report_unsupported(
                    &format!("unkeyed access to per-user mapping `{}`", var.source_name),
                    span,
                );
                ExprResult::unsupported(&format!("unkeyed `{}`", var.source_name))
            }
        }
    }

    fn transform_member(&mut self, base: &Expr, member: &str, span: Span) -> ExprResult {
        // Environment accesses first; they look like member reads but are
        // calls on the Target.
        if let ExprKind::Ident { name } = &base.kind {
            match (name.as_str(), member) {
                ("msg", "sender") => return ExprResult::plain(self.ctx.sender_expr()),
                ("msg", "value") => {
                    self.report_unsupported("msg.value", span);
                    return ExprResult::unsupported("msg.value");
                }
                ("tx", "origin") => {
                    self.report_unsupported("tx.origin", span);
                    return ExprResult::unsupported("tx.origin");
                }
                ("block", "timestamp") => {
                    self.ctx.require_use("timestamp");
                    return ExprResult::plain(
                        MoveExpr::call(Some("timestamp"), "now_seconds", Vec::new())
                            .with_type(MoveType::U64),
                    );
                }
                ("block", "number") => {
                    self.ctx.require_use("block");
                    return ExprResult::plain(
                        MoveExpr::call(Some("block"), "get_current_block_height", Vec::new())
                            .with_type(MoveType::U64),
                    );
                }
                _ => {}
            }

            // Enum variant constant.
            let enum_name = naming::type_name(name);
            if let Some(enum_def) = self.ctx.module.contract.enum_def(&enum_name) {
                if enum_def.variants.iter().any(|v| v == member) {
                    let const_name = format!(
                        "{}_{}",
                        naming::to_screaming_snake(name),
                        naming::to_screaming_snake(member)
                    );
                    return ExprResult::plain(MoveExpr::ident_typed(&const_name, MoveType::U8));
                }
            }

            // Flattened library constant.
            let qualified = format!("{}.{}", name, member);
            if let Some(flattened) = self.ctx.module.contract.library_members.get(&qualified) {
                if let Some(var) = self.ctx.module.contract.state_var(flattened) {
                    let ty = lower_type(&var.ty, self.ctx.module.contract);
                    return ExprResult::plain(MoveExpr::ident_typed(flattened, ty));
                }
            }
        }

        let base_result = self.transform(base);
        let base_ty = base_result.expr.inferred.clone();

        // `.length` on vectors is a call on the Target.
        if (member == "length" || member == "len")
            && matches!(
                base_ty.as_ref().map(MoveType::dereferenced),
                Some(MoveType::Vector(_))
            )
        {
            self.ctx.require_use("vector");
            return ExprResult {
                expr: MoveExpr::call(
                    Some("vector"),
                    "length",
                    vec![MoveExpr::borrow(false, base_result.expr)],
                )
                .with_type(MoveType::U64),
                pre: base_result.pre,
            };
        }

        // Struct field resolution through the struct table.
        if let Some(MoveType::Struct(struct_name)) = base_ty.as_ref().map(MoveType::dereferenced) {
            if let Some(struct_def) = self.ctx.module.contract.struct_def(struct_name) {
                if let Some(field) = struct_def.fields.iter().find(|f| f.name == member) {
                    let field_ty = lower_type(&field.ty, self.ctx.module.contract);
                    return ExprResult {
                        expr: MoveExpr::field_typed(
                            base_result.expr,
                            &naming::member_name(member),
                            field_ty,
                        ),
                        pre: base_result.pre,
                    };
                }
            }
        }

        if matches!(base_ty.as_ref().map(MoveType::dereferenced), Some(MoveType::Address)) {
            self.report_unsupported(&format!("address member `{}`", member), span);
            return ExprResult::unsupported(&format!("address member `{}`", member));
        }

        // Unknown base type: keep the field access and let the validator
        // complain if it is wrong.
        ExprResult {
            expr: MoveExpr::field(base_result.expr, &naming::member_name(member)),
            pre: base_result.pre,
        }
    }

    // -------------------------------------------------------------------
    // Operators
    // -------------------------------------------------------------------

    fn transform_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        span: Span,
    ) -> ExprResult {
        let mut lhs_result = self.transform(lhs);
        let mut rhs_result = self.transform(rhs);
        lhs_result.pre.append(&mut rhs_result.pre);
        let pre = lhs_result.pre;

        if op == BinaryOp::Pow {
            let (expr, ty) = self.lower_pow(lhs_result.expr, rhs_result.expr);
            return ExprResult {
                expr: expr.with_type(ty),
                pre,
            };
        }

        let (lhs_expr, rhs_expr, operand_ty) = if matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
            // Shifts are not harmonized: the result keeps the left
            // operand's type and the amount is always u8 on the Target.
            let ty = lhs_result.expr.inferred.clone();
            let mut amount = rhs_result.expr;
            amount = match amount.inferred.clone() {
                Some(MoveType::U8) => amount,
                Some(amount_ty) if amount_ty.is_integer() => {
                    self.cast_to(amount, MoveType::U8)
                }
                _ => {
                    amount.inferred = Some(MoveType::U8);
                    amount
                }
            };
            (lhs_result.expr, amount, ty)
        } else if op.needs_harmonization() {
            self.harmonize_pair(
                lhs_result.expr,
                rhs_result.expr,
                span,
                &format!("operands of `{:?}`", op),
            )
        } else {
            (lhs_result.expr, rhs_result.expr, Some(MoveType::Bool))
        };

        let move_op = match op {
            BinaryOp::Add => MoveBinOp::Add,
            BinaryOp::Sub => MoveBinOp::Sub,
            BinaryOp::Mul => MoveBinOp::Mul,
            BinaryOp::Div => MoveBinOp::Div,
            BinaryOp::Mod => MoveBinOp::Mod,
            BinaryOp::BitAnd => MoveBinOp::BitAnd,
            BinaryOp::BitOr => MoveBinOp::BitOr,
            BinaryOp::BitXor => MoveBinOp::Xor,
            BinaryOp::Shl => MoveBinOp::Shl,
            BinaryOp::Shr => MoveBinOp::Shr,
            BinaryOp::And => MoveBinOp::And,
            BinaryOp::Or => MoveBinOp::Or,
            BinaryOp::Eq => MoveBinOp::Eq,
            BinaryOp::Ne => MoveBinOp::Ne,
            BinaryOp::Lt => MoveBinOp::Lt,
            BinaryOp::Le => MoveBinOp::Le,
            BinaryOp::Gt => MoveBinOp::Gt,
            BinaryOp::Ge => MoveBinOp::Ge,
            BinaryOp::Pow => unreachable!("BinaryOp::Pow is handled earlier via lower_pow"),
        };

        let result_ty = if op.is_comparison() || matches!(op, BinaryOp::And | BinaryOp::Or) {
            Some(MoveType::Bool)
        } else {
            operand_ty
        };

        let mut expr = MoveExpr::binary(move_op, lhs_expr, rhs_expr);
        expr.inferred = result_ty;
        ExprResult { expr, pre }
    }

    /// Bring two operands to one primitive integer width
    fn harmonize_pair(
        &mut self,
        lhs: MoveExpr,
        rhs: MoveExpr,
        span: Span,
        what: &str,
    ) -> (MoveExpr, MoveExpr, Option<MoveType>) {
        match (lhs.inferred.clone(), rhs.inferred.clone()) {
            (Some(lt), Some(rt)) if lt == rt => (lhs, rhs, Some(lt)),
            (Some(lt), Some(rt)) if lt.is_integer() && rt.is_integer() => {
                let lw = lt.width_bits().unwrap();
                let rw = rt.width_bits().unwrap();
                if lw < rw {
                    let widened = self.cast_to(lhs, rt.clone());
                    (widened, rhs, Some(rt))
                } else {
                    let widened = self.cast_to(rhs, lt.clone());
                    (lhs, widened, Some(lt))
                }
            }
            // Untyped literal adopts the typed side's width.
            (None, Some(rt)) if matches!(lhs.kind, MoveExprKind::Literal { .. }) => {
                (lhs.with_type(rt.clone()), rhs, Some(rt))
            }
            (Some(lt), None) if matches!(rhs.kind, MoveExprKind::Literal { .. }) => {
                (lhs, rhs.with_type(lt.clone()), Some(lt))
            }
            (None, None) => (lhs, rhs, None),
            (Some(lt), Some(rt)) => {
                self.ctx.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::TypeWideningFailure,
                        format!("cannot harmonize {}: {:?} vs {:?}", what, lt, rt),
                    )
                    .with_span(span)
                    .in_contract(&self.ctx.module.contract.source_name),
                );
                (lhs, rhs, None)
            }
            (lt, _) => {
                let ty = lt;
                (lhs, rhs, ty)
            }
        }
    }

    /// `**` has no Target operator; route through the math helpers
    fn lower_pow(&mut self, base: MoveExpr, exp: MoveExpr) -> (MoveExpr, MoveType) {
        let width = base
            .inferred
            .as_ref()
            .and_then(MoveType::width_bits)
            .unwrap_or(256);
        if width <= 64 {
            self.ctx.require_use("math64");
            let base = self.coerce(base, &MoveType::U64);
            let exp = self.coerce(exp, &MoveType::U64);
            (
                MoveExpr::call(Some("math64"), "pow", vec![base, exp]),
                MoveType::U64,
            )
        } else if width <= 128 {
            self.ctx.require_use("math128");
            let base = self.coerce(base, &MoveType::U128);
            let exp = self.coerce(exp, &MoveType::U128);
            (
                MoveExpr::call(Some("math128"), "pow", vec![base, exp]),
                MoveType::U128,
            )
        } else {
            self.ctx.require_use("sol_runtime");
            let base = self.coerce(base, &MoveType::U256);
            let exp = self.coerce(exp, &MoveType::U256);
            (
                MoveExpr::call(Some("sol_runtime"), "pow_u256", vec![base, exp]),
                MoveType::U256,
            )
        }
    }

    fn transform_unary(&mut self, op: UnaryOp, operand: &Expr, span: Span) -> ExprResult {
        let mut result = self.transform(operand);
        match op {
            UnaryOp::Not => {
                result.expr = MoveExpr::typed(
                    MoveExprKind::Not(Box::new(result.expr)),
                    MoveType::Bool,
                );
                result
            }
            UnaryOp::BitNot => {
                // No `~` on the Target: XOR against the width's all-ones
                // mask instead.
                let ty = result
                    .expr
                    .inferred
                    .clone()
                    .filter(MoveType::is_integer)
                    .unwrap_or(MoveType::U256);
                let mask = not_mask(&ty).expect("mask table covers every integer width");
                let operand = self.coerce(result.expr, &ty);
                let mut expr = MoveExpr::binary(
                    MoveBinOp::Xor,
                    operand,
                    MoveExpr::literal(mask, ty.clone()),
                );
                expr.inferred = Some(ty);
                ExprResult {
                    expr,
                    pre: result.pre,
                }
            }
            UnaryOp::Neg => {
                self.report_unsupported("unary negation on unsigned value", span);
                ExprResult::unsupported("unary negation")
            }
        }
    }

    fn transform_cast(&mut self, ty: &SourceType, value: &Expr, _span: Span) -> ExprResult {
        let target = lower_type(ty, self.ctx.module.contract);
        let result = self.transform(value);
        let pre = result.pre;
        let source_ty = result.expr.inferred.clone();

        // Integer → bool has no Target cast; compare against zero.
        if target == MoveType::Bool {
            if source_ty.as_ref().map(MoveType::is_integer).unwrap_or(true) {
                let mut expr = MoveExpr::binary(
                    MoveBinOp::Ne,
                    result.expr,
                    MoveExpr::new(MoveExprKind::Literal {
                        digits: "0".to_string(),
                        suffix: None,
                    }),
                );
                expr.inferred = Some(MoveType::Bool);
                return ExprResult { expr, pre };
            }
            return ExprResult {
                expr: result.expr,
                pre,
            };
        }

        // Bool → integer: a conditional, the Target has no such cast
        // either.
        if source_ty == Some(MoveType::Bool) && target.is_integer() {
            let mut expr = MoveExpr::new(MoveExprKind::IfExpr {
                cond: Box::new(result.expr),
                then_value: Box::new(MoveExpr::literal("1", target.clone())),
                else_value: Box::new(MoveExpr::literal("0", target.clone())),
            });
            expr.inferred = Some(target);
            return ExprResult { expr, pre };
        }

        if !target.is_integer() || source_ty == Some(target.clone()) {
            // address(x), payable(x), contract casts: identity on the
            // Target.
            let mut expr = result.expr;
            if expr.inferred.is_none() {
                expr.inferred = Some(target);
            }
            return ExprResult { expr, pre };
        }

        // Untyped literal with an explicit cast: the annotation is the
        // cast.
        if result.expr.inferred.is_none()
            && matches!(result.expr.kind, MoveExprKind::Literal { .. })
        {
            return ExprResult {
                expr: result.expr.with_type(target),
                pre,
            };
        }

        ExprResult {
            expr: self.cast_to(result.expr, target),
            pre,
        }
    }

    // -------------------------------------------------------------------
    // Calls
    // -------------------------------------------------------------------

    fn transform_call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> ExprResult {
        match &callee.kind {
            ExprKind::Ident { name } => self.transform_named_call(name, args, span),
            ExprKind::Member { base, member } => {
                if let ExprKind::Ident { name } = &base.kind {
                    if name == "abi" {
                        self.report_unsupported(&format!("abi.{}", member), span);
                        return ExprResult::unsupported(&format!("abi.{}", member));
                    }
                    if name == "this" {
                        return self.transform_named_call(member, args, span);
                    }
                    // Flattened library call.
                    let qualified = format!("{}.{}", name, member);
                    if let Some(flattened) =
                        self.ctx.module.contract.library_members.get(&qualified).cloned()
                    {
                        return self.transform_local_call(&flattened, args, span);
                    }
                }

                // Vector methods.
                let base_result = self.transform(base);
                let base_ty = base_result.expr.inferred.clone();
                if let Some(MoveType::Vector(elem)) =
                    base_ty.as_ref().map(MoveType::dereferenced)
                {
                    return self.transform_vector_method(
                        base_result,
                        (**elem).clone(),
                        member,
                        args,
                        span,
                    );
                }

                // Anything else with a computed receiver is a dynamic
                // external call the Target's module system cannot express.
                self.report_unsupported(&format!("dynamic external call `.{}`", member), span);
                ExprResult::unsupported(&format!("dynamic external call `.{}`", member))
            }
            _ => {
                self.report_unsupported("computed call target", span);
                ExprResult::unsupported("computed call target")
            }
        }
    }

    fn transform_named_call(&mut self, name: &str, args: &[Expr], span: Span) -> ExprResult {
        match name {
            "keccak256" => {
                self.ctx.require_use("aptos_hash");
                let (lowered, pre) = self.transform_args(args, None);
                return ExprResult {
                    expr: MoveExpr::call(Some("aptos_hash"), "keccak256", lowered)
                        .with_type(MoveType::Vector(Box::new(MoveType::U8))),
                    pre,
                };
            }
            "sha256" => {
                self.ctx.require_use("hash");
                let (lowered, pre) = self.transform_args(args, None);
                return ExprResult {
                    expr: MoveExpr::call(Some("hash"), "sha2_256", lowered)
                        .with_type(MoveType::Vector(Box::new(MoveType::U8))),
                    pre,
                };
            }
            "payable" => {
                // payable(x) is an address on the Target.
                if let Some(arg) = args.first() {
                    return self.transform(arg);
                }
            }
            _ => {}
        }

        let local_name = naming::member_name(name);
        if self.ctx.module.contract.function(&local_name).is_some() {
            return self.transform_local_call(&local_name, args, span);
        }

        self.report_unsupported(&format!("call to unknown function `{}`", name), span);
        self.ctx.diagnostics.push(
            Diagnostic::error(
                DiagnosticKind::UnresolvedSymbol,
                format!("no visible declaration provides function `{}`", name),
            )
            .with_span(span)
            .in_contract(&self.ctx.module.contract.source_name),
        );
        ExprResult::unsupported(&format!("call to `{}`", name))
    }

    fn transform_local_call(&mut self, ir_name: &str, args: &[Expr], span: Span) -> ExprResult {
        let sig = match self.ctx.module.signature(ir_name) {
            Some(sig) => sig.clone(),
            None => {
                self.report_unsupported(&format!("call to `{}`", ir_name), span);
                return ExprResult::unsupported(&format!("call to `{}`", ir_name));
            }
        };

        let mut lowered = Vec::new();
        let mut pre = Vec::new();
        if sig.takes_signer {
            match &self.ctx.signer_param {
                Some(signer) => lowered.push(MoveExpr::ident(signer)),
                None => {
                    // A read-only caller cannot produce a signer handle.
                    self.report_unsupported(
                        &format!("signer-requiring call to `{}` from a view context", ir_name),
                        span,
                    );
                    return ExprResult::unsupported(&format!("call to `{}`", ir_name));
                }
            }
        }
        if sig.takes_caller {
            let sender = self.ctx.sender_expr();
            lowered.push(sender);
        }
        for (i, arg) in args.iter().enumerate() {
            let expected = sig.param_types.get(i);
            let mut result = self.transform_expecting(arg, expected);
            pre.append(&mut result.pre);
            lowered.push(result.expr);
        }

        let ty = match sig.returns.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        };
        let mut expr = MoveExpr::call(None, ir_name, lowered);
        expr.inferred = ty;
        ExprResult { expr, pre }
    }

    fn transform_vector_method(
        &mut self,
        base: ExprResult,
        elem: MoveType,
        member: &str,
        args: &[Expr],
        span: Span,
    ) -> ExprResult {
        self.ctx.require_use("vector");
        let mut pre = base.pre;
        match member {
            "push" => {
                let receiver = self.as_lvalue(base.expr, span);
                let value = args.first().map(|arg| {
                    let mut result = self.transform_expecting(arg, Some(&elem));
                    pre.append(&mut result.pre);
                    result.expr
                });
                let mut call_args = vec![MoveExpr::borrow(true, receiver)];
                if let Some(value) = value {
                    call_args.push(value);
                }
                ExprResult {
                    expr: MoveExpr::call(Some("vector"), "push_back", call_args),
                    pre,
                }
            }
            "pop" => {
                let receiver = self.as_lvalue(base.expr, span);
                ExprResult {
                    expr: MoveExpr::call(
                        Some("vector"),
                        "pop_back",
                        vec![MoveExpr::borrow(true, receiver)],
                    )
                    .with_type(elem),
                    pre,
                }
            }
            _ => {
                self.report_unsupported(&format!("vector method `{}`", member), span);
                ExprResult::unsupported(&format!("vector method `{}`", member))
            }
        }
    }

    fn transform_args(
        &mut self,
        args: &[Expr],
        expected: Option<&[MoveType]>,
    ) -> (Vec<MoveExpr>, Vec<MoveStmt>) {
        let mut lowered = Vec::new();
        let mut pre = Vec::new();
        for (i, arg) in args.iter().enumerate() {
            let want = expected.and_then(|tys| tys.get(i));
            let mut result = self.transform_expecting(arg, want);
            pre.append(&mut result.pre);
            lowered.push(result.expr);
        }
        (lowered, pre)
    }

    // -------------------------------------------------------------------
    // Collection reads
    // -------------------------------------------------------------------

    /// Peel `C[k1][k2]…` into root and key list, outermost key first
    fn index_chain<'e>(expr: &'e Expr) -> (&'e Expr, Vec<&'e Expr>) {
        let mut keys = Vec::new();
        let mut current = expr;
        while let ExprKind::Index { base, index } = &current.kind {
            keys.push(&**index);
            current = base;
        }
        keys.reverse();
        (current, keys)
    }

    fn transform_index_read(&mut self, expr: &Expr) -> ExprResult {
        let (root, keys) = Self::index_chain(expr);
        let span = expr.span;

        // State-variable collections first.
        if let ExprKind::Ident { name } = &root.kind {
            if !self.ctx.locals.contains_key(name) {
                if let Some(var) = self
                    .ctx
                    .module
                    .contract
                    .state_var_by_source_name(name)
                    .cloned()
                {
                    if var.ty.is_mapping() {
                        return self.read_state_table(&var, &keys, span, false).0;
                    }
                }
            }
        }

        // Vector indexing, local or state.
        let base_result = self.transform(root);
        let base_ty = base_result.expr.inferred.clone();
        if let Some(MoveType::Vector(elem)) = base_ty.as_ref().map(MoveType::dereferenced) {
            let elem = (**elem).clone();
            let mut pre = base_result.pre;
            let mut current = base_result.expr;
            for key in keys {
                let mut key_result = self.transform_expecting(key, Some(&MoveType::U64));
                pre.append(&mut key_result.pre);
                current = MoveExpr::deref(MoveExpr::call(
                    Some("vector"),
                    "borrow",
                    vec![MoveExpr::borrow(false, current), key_result.expr],
                ))
                .with_type(elem.clone());
                self.ctx.require_use("vector");
            }
            return ExprResult { expr: current, pre };
        }

        self.report_unsupported("index access on non-collection value", span);
        ExprResult::unsupported("index access on non-collection value")
    }

    /// Read a state table entry. When `for_capture` is set and the read is
    /// eligible as a table-copy origin, the second element carries the
    /// [`TableCopyCapture`] with the already-translated keys.
    pub(crate) fn read_state_table(
        &mut self,
        var: &IrStateVar,
        keys: &[&Expr],
        span: Span,
        for_capture: bool,
    ) -> (ExprResult, Option<TableCopyCapture>) {
        let contract = self.ctx.module.contract;
        let group = match self.ctx.module.plan.group_of(&var.name) {
            Some(group) => group.clone(),
            None => {
                self.report_unsupported(
                    &format!("access to unpartitioned variable `{}`", var.source_name),
                    span,
                );
                return (
                    ExprResult::unsupported(&format!("access to `{}`", var.source_name)),
                    None,
                );
            }
        };

        let (key_ty, value_ty) = match &var.ty {
            SourceType::Mapping(key, value) => ((**key).clone(), (**value).clone()),
            _ => {
                return (
                    ExprResult::unsupported(&format!("indexing `{}`", var.source_name)),
                    None,
                )
            }
        };

        // Per-user resources read at the keyed address.
        if group.per_user {
            let key = match keys.first() {
                Some(key) => key,
                None => {
                    return (
                        ExprResult::unsupported(&format!("unkeyed `{}`", var.source_name)),
                        None,
                    )
                }
            };
            let key_result = self.transform_expecting(key, Some(&MoveType::Address));
            let value_move_ty = lower_type(&value_ty, contract);
            self.ctx.acquires.insert(group.name.clone());
            let addr = key_result.expr;
            let read = MoveExpr::field_typed(
                MoveExpr::new(MoveExprKind::BorrowGlobal {
                    mutable: false,
                    ty: group.name.clone(),
                    addr: Box::new(addr.clone()),
                }),
                PER_USER_FIELD,
                value_move_ty.clone(),
            );
            let default = self
                .default_value_expr(&value_move_ty)
                .unwrap_or_else(|| MoveExpr::literal("0", MoveType::U64));
            let mut expr = MoveExpr::new(MoveExprKind::IfExpr {
                cond: Box::new(MoveExpr::new(MoveExprKind::Exists {
                    ty: group.name.clone(),
                    addr: Box::new(addr),
                })),
                then_value: Box::new(read),
                else_value: Box::new(default),
            });
            expr.inferred = Some(value_move_ty);
            return (
                ExprResult {
                    expr,
                    pre: key_result.pre,
                },
                None,
            );
        }

        let key_move_ty = lower_type(&key_ty, contract);
        let base = self.ctx.group_var(&group, false);
        let table_expr = MoveExpr::field(base, &var.name);
        self.ctx.require_use("table");

        let mut pre = Vec::new();
        let first_key = match keys.first() {
            Some(key) => key,
            None => {
                return (
                    ExprResult::unsupported(&format!("unkeyed `{}`", var.source_name)),
                    None,
                )
            }
        };
        let mut key_result = self.transform_expecting(first_key, Some(&key_move_ty));
        pre.append(&mut key_result.pre);
        let outer_key = key_result.expr;

        match (&value_ty, keys.len()) {
            // Nested mapping, both keys supplied.
            (SourceType::Mapping(inner_key, inner_value), 2) => {
                let inner_key_ty = lower_type(inner_key, contract);
                let inner_value_ty = lower_type(inner_value, contract);
                pre.push(self.ensure_outer_entry(&var.name, &group, &outer_key));
                let mut inner_key_result =
                    self.transform_expecting(keys[1], Some(&inner_key_ty));
                pre.append(&mut inner_key_result.pre);

                let inner_table = MoveExpr::call(
                    Some("table"),
                    "borrow",
                    vec![
                        MoveExpr::borrow(false, table_expr.clone()),
                        outer_key.clone(),
                    ],
                );
                let (expr, mut inner_pre) =
                    self.read_entry(inner_table, inner_key_result.expr.clone(), &inner_value_ty);
                pre.append(&mut inner_pre);
                let capture = if for_capture {
                    Some(TableCopyCapture {
                        table: table_expr,
                        keys: vec![outer_key, inner_key_result.expr],
                        group: group.name.clone(),
                    })
                } else {
                    None
                };
                (ExprResult { expr, pre }, capture)
            }
            (SourceType::Mapping(_, _), _) => {
                self.report_unsupported(
                    &format!("partial access to nested mapping `{}`", var.source_name),
                    span,
                );
                (
                    ExprResult::unsupported(&format!("partial `{}` access", var.source_name)),
                    None,
                )
            }
            (value, 1) => {
                let value_move_ty = lower_type(value, contract);
                let (expr, mut entry_pre) = self.read_entry(
                    MoveExpr::borrow(false, table_expr.clone()),
                    outer_key.clone(),
                    &value_move_ty,
                );
                pre.append(&mut entry_pre);
                let capture = if for_capture {
                    Some(TableCopyCapture {
                        table: table_expr,
                        keys: vec![outer_key],
                        group: group.name.clone(),
                    })
                } else {
                    None
                };
                (ExprResult { expr, pre }, capture)
            }
            _ => {
                self.report_unsupported(
                    &format!("index depth mismatch on `{}`", var.source_name),
                    span,
                );
                (
                    ExprResult::unsupported(&format!("index depth on `{}`", var.source_name)),
                    None,
                )
            }
        }
    }

    /// One table-entry read: scalar defaults use `borrow_with_default`,
    /// struct values assert existence and borrow plainly. `table_arg` must
    /// already be a table reference.
    fn read_entry(
        &mut self,
        table_arg: MoveExpr,
        key: MoveExpr,
        value_ty: &MoveType,
    ) -> (MoveExpr, Vec<MoveStmt>) {
        match self.default_value_expr(value_ty) {
            Some(default) => {
                let call = MoveExpr::call(
                    Some("table"),
                    "borrow_with_default",
                    vec![table_arg, key, MoveExpr::borrow(false, default)],
                );
                (
                    MoveExpr::deref(call).with_type(value_ty.clone()),
                    Vec::new(),
                )
            }
            None => {
                // No scalar default: existence must be guaranteed before
                // the borrow.
                let code = self.ctx.code_expr("E_NOT_INITIALIZED");
                let contains = MoveExpr::call(
                    Some("table"),
                    "contains",
                    vec![table_arg.clone(), key.clone()],
                );
                let guard = MoveStmt::Expr(MoveExpr::call(
                    None,
                    "assert!",
                    vec![contains, code],
                ));
                let call = MoveExpr::call(Some("table"), "borrow", vec![table_arg, key]);
                (
                    MoveExpr::deref(call).with_type(value_ty.clone()),
                    vec![guard],
                )
            }
        }
    }

    /// Bind a composite value to a temporary first. A table write whose
    /// value reads the same table must not borrow it inside the upsert's
    /// argument list; hoisting sequences the two borrows.
    fn hoist_if_complex(&mut self, expr: MoveExpr, stmts: &mut Vec<MoveStmt>) -> MoveExpr {
        match &expr.kind {
            MoveExprKind::Ident(_)
            | MoveExprKind::Literal { .. }
            | MoveExprKind::BoolLit(_)
            | MoveExprKind::AddressLit(_) => expr,
            _ => {
                let name = self.ctx.fresh_temp("value");
                let inferred = expr.inferred.clone();
                stmts.push(MoveStmt::Let {
                    name: name.clone(),
                    ty: None,
                    value: Some(expr),
                });
                MoveExpr {
                    kind: MoveExprKind::Ident(name),
                    inferred,
                }
            }
        }
    }

    /// Pre-statement ensuring a nested table's outer entry exists
    fn ensure_outer_entry(
        &mut self,
        var_name: &str,
        group: &crate::analysis::ResourceGroup,
        outer_key: &MoveExpr,
    ) -> MoveStmt {
        if self.ctx.read_only {
            // A view cannot create the inner table; it can only insist it
            // is there.
            let base = self.ctx.group_var(group, false);
            let table_expr = MoveExpr::field(base, var_name);
            let code = self.ctx.code_expr("E_NOT_INITIALIZED");
            let contains = MoveExpr::call(
                Some("table"),
                "contains",
                vec![MoveExpr::borrow(false, table_expr), outer_key.clone()],
            );
            return MoveStmt::Expr(MoveExpr::call(None, "assert!", vec![contains, code]));
        }

        let base = self.ctx.group_var(group, true);
        let table_expr = MoveExpr::field(base, var_name);
        let contains = MoveExpr::call(
            Some("table"),
            "contains",
            vec![
                MoveExpr::borrow(false, table_expr.clone()),
                outer_key.clone(),
            ],
        );
        let add = MoveStmt::Expr(MoveExpr::call(
            Some("table"),
            "add",
            vec![
                MoveExpr::borrow(true, table_expr),
                outer_key.clone(),
                MoveExpr::call(Some("table"), "new", Vec::new()),
            ],
        ));
        MoveStmt::If {
            cond: MoveExpr::new(MoveExprKind::Not(Box::new(contains))),
            then_block: vec![add],
            else_block: None,
        }
    }

    /// Zero value of a Target type, when one exists
    fn default_value_expr(&mut self, ty: &MoveType) -> Option<MoveExpr> {
        match ty {
            _ if ty.is_integer() => Some(MoveExpr::literal("0", ty.clone())),
            MoveType::Bool => Some(MoveExpr::bool_lit(false)),
            MoveType::Address => Some(MoveExpr::address_lit("0x0")),
            MoveType::Vector(_) => Some(MoveExpr::typed(
                MoveExprKind::VectorLit(Vec::new()),
                ty.clone(),
            )),
            MoveType::String => {
                self.ctx.require_use("string");
                Some(
                    MoveExpr::call(
                        Some("string"),
                        "utf8",
                        vec![MoveExpr::new(MoveExprKind::ByteStringLit(String::new()))],
                    )
                    .with_type(MoveType::String),
                )
            }
            _ => None,
        }
    }

    // -------------------------------------------------------------------
    // Assignments
    // -------------------------------------------------------------------

    /// Lower an assignment into Target statements. Handles compound
    /// desugaring, collection upserts, per-user resources, table-copy
    /// mutation marking and plain local/state writes.
    pub fn lower_assignment(
        &mut self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        span: Span,
    ) -> Vec<MoveStmt> {
        // Compound assignment desugars to a plain write of the combined
        // value so every collection rule below applies uniformly.
        if let Some(binary) = op.binary_op() {
            let combined = Expr {
                kind: ExprKind::Binary {
                    op: binary,
                    lhs: Box::new(target.clone()),
                    rhs: Box::new(value.clone()),
                },
                span,
            };
            return self.lower_assignment(AssignOp::Assign, target, &combined, span);
        }

        match &target.kind {
            ExprKind::Index { .. } => self.lower_index_write(target, value, span),
            ExprKind::Tuple { items } => self.lower_tuple_assign(items, value, span),
            ExprKind::Ident { name } => {
                if let Some(local_ty) = self.ctx.locals.get(name).cloned() {
                    let local = naming::member_name(name);
                    // Rebinding a copied entry breaks its aliasing.
                    self.ctx.origins.forget(&local);
                    let mut result = self.transform_expecting(value, Some(&local_ty));
                    let mut stmts = std::mem::take(&mut result.pre);
                    stmts.push(MoveStmt::Assign {
                        target: MoveExpr::ident_typed(&local, local_ty),
                        value: result.expr,
                    });
                    return stmts;
                }
                self.lower_state_scalar_write(name, value, span)
            }
            ExprKind::Member { .. } => self.lower_member_write(target, value, span),
            _ => {
                self.report_unsupported("assignment to this expression form", span);
                vec![MoveStmt::Unsupported {
                    pattern: "assignment target".to_string(),
                }]
            }
        }
    }

    fn lower_state_scalar_write(
        &mut self,
        name: &str,
        value: &Expr,
        span: Span,
    ) -> Vec<MoveStmt> {
        let var = match self.ctx.module.contract.state_var_by_source_name(name) {
            Some(var) => var.clone(),
            None => {
                self.ctx.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::UnresolvedSymbol,
                        format!("assignment to unknown name `{}`", name),
                    )
                    .with_span(span)
                    .in_contract(&self.ctx.module.contract.source_name),
                );
                return vec![MoveStmt::Unsupported {
                    pattern: format!("assignment to `{}`", name),
                }];
            }
        };

        let var_ty = lower_type(&var.ty, self.ctx.module.contract);
        let mut result = self.transform_expecting(value, Some(&var_ty));
        let mut stmts = std::mem::take(&mut result.pre);
        match self.ctx.state_field(&var, true) {
            Some(field) => {
                stmts.push(MoveStmt::Assign {
                    target: field,
                    value: result.expr,
                });
            }
            None => {
                self.report_unsupported(
                    &format!("whole-mapping assignment to `{}`", var.source_name),
                    span,
                );
                stmts.push(MoveStmt::Unsupported {
                    pattern: format!("assignment to `{}`", var.source_name),
                });
            }
        }
        stmts
    }

    fn lower_member_write(&mut self, target: &Expr, value: &Expr, span: Span) -> Vec<MoveStmt> {
        // Mark table-copy mutation on the root local, if there is one.
        let mut root = target;
        while let ExprKind::Member { base, .. } | ExprKind::Index { base, .. } = &root.kind {
            root = base;
        }
        if let ExprKind::Ident { name } = &root.kind {
            if self.ctx.locals.contains_key(name) {
                let local = naming::member_name(name);
                self.ctx.origins.mark_mutated(&local);
                // The eventual write-back upserts into the origin table, so
                // its group must be borrowed mutably.
                if let Some(group_name) = self.ctx.origins.group_of(&local) {
                    if let Some(group) = self.ctx.module.plan.group(&group_name).cloned() {
                        self.ctx.group_var(&group, true);
                    }
                }
            }
        }

        let target_result = self.transform(target);
        let expected = target_result.expr.inferred.clone();
        let mut value_result = self.transform_expecting(value, expected.as_ref());

        let mut stmts = Vec::new();
        stmts.extend(target_result.pre);
        stmts.append(&mut value_result.pre);
        stmts.push(MoveStmt::Assign {
            target: self.as_lvalue(target_result.expr, span),
            value: value_result.expr,
        });
        stmts
    }

    /// Rewrite a read-shaped borrow chain into its mutable form for use as
    /// an assignment target
    fn as_lvalue(&mut self, expr: MoveExpr, span: Span) -> MoveExpr {
        match expr.kind {
            MoveExprKind::Field { base, field } => {
                let base = self.as_lvalue(*base, span);
                MoveExpr {
                    kind: MoveExprKind::Field {
                        base: Box::new(base),
                        field,
                    },
                    inferred: expr.inferred,
                }
            }
            MoveExprKind::Deref(inner) => {
                let inner = self.as_lvalue(*inner, span);
                MoveExpr {
                    kind: MoveExprKind::Deref(Box::new(inner)),
                    inferred: expr.inferred,
                }
            }
            MoveExprKind::Call {
                module,
                func,
                type_args,
                args,
            } if module.as_deref() == Some("table") && func == "borrow" => {
                let args = args
                    .into_iter()
                    .map(|arg| self.as_lvalue(arg, span))
                    .collect();
                MoveExpr {
                    kind: MoveExprKind::Call {
                        module,
                        func: "borrow_mut".to_string(),
                        type_args,
                        args,
                    },
                    inferred: expr.inferred,
                }
            }
            MoveExprKind::Call {
                module,
                func,
                type_args,
                args,
            } if module.as_deref() == Some("vector") && func == "borrow" => {
                let args = args
                    .into_iter()
                    .map(|arg| self.as_lvalue(arg, span))
                    .collect();
                MoveExpr {
                    kind: MoveExprKind::Call {
                        module,
                        func: "borrow_mut".to_string(),
                        type_args,
                        args,
                    },
                    inferred: expr.inferred,
                }
            }
            MoveExprKind::Borrow { expr: inner, .. } => {
                let inner = self.as_lvalue(*inner, span);
                MoveExpr {
                    kind: MoveExprKind::Borrow {
                        mutable: true,
                        expr: Box::new(inner),
                    },
                    inferred: expr.inferred,
                }
            }
            MoveExprKind::Ident(name) => {
                // Group locals must be re-borrowed mutably.
                if let Some(group) = self
                    .ctx
                    .module
                    .plan
                    .groups
                    .iter()
                    .find(|g| crate::transform::ModuleCtx::group_local(&g.name) == name)
                    .cloned()
                {
                    self.ctx.group_var(&group, true);
                }
                MoveExpr {
                    kind: MoveExprKind::Ident(name),
                    inferred: expr.inferred,
                }
            }
            other => MoveExpr {
                kind: other,
                inferred: expr.inferred,
            },
        }
    }

    fn lower_index_write(&mut self, target: &Expr, value: &Expr, span: Span) -> Vec<MoveStmt> {
        let (root, keys) = Self::index_chain(target);

        if let ExprKind::Ident { name } = &root.kind {
            if !self.ctx.locals.contains_key(name) {
                if let Some(var) = self
                    .ctx
                    .module
                    .contract
                    .state_var_by_source_name(name)
                    .cloned()
                {
                    if var.ty.is_mapping() {
                        return self.write_state_table(&var, &keys, value, span);
                    }
                }
            }
        }

        // Vector element write: `*vector::borrow_mut(&mut v, i) = x;`.
        let base_result = self.transform(root);
        let base_ty = base_result.expr.inferred.clone();
        if let Some(MoveType::Vector(elem)) = base_ty.as_ref().map(MoveType::dereferenced) {
            let elem = (**elem).clone();
            self.ctx.require_use("vector");
            let mut stmts = base_result.pre;
            let vec_lvalue = self.as_lvalue(base_result.expr, span);
            let key = keys.first().expect("index write always has a key");
            let mut key_result = self.transform_expecting(key, Some(&MoveType::U64));
            stmts.append(&mut key_result.pre);
            let mut value_result = self.transform_expecting(value, Some(&elem));
            stmts.append(&mut value_result.pre);
            stmts.push(MoveStmt::Assign {
                target: MoveExpr::deref(MoveExpr::call(
                    Some("vector"),
                    "borrow_mut",
                    vec![MoveExpr::borrow(true, vec_lvalue), key_result.expr],
                )),
                value: value_result.expr,
            });
            return stmts;
        }

        self.report_unsupported("indexed write to non-collection value", span);
        vec![MoveStmt::Unsupported {
            pattern: "indexed write".to_string(),
        }]
    }

    fn write_state_table(
        &mut self,
        var: &IrStateVar,
        keys: &[&Expr],
        value: &Expr,
        span: Span,
    ) -> Vec<MoveStmt> {
        let contract = self.ctx.module.contract;
        let group = match self.ctx.module.plan.group_of(&var.name) {
            Some(group) => group.clone(),
            None => {
                return vec![MoveStmt::Unsupported {
                    pattern: format!("write to `{}`", var.source_name),
                }]
            }
        };
        let (key_ty, value_ty) = match &var.ty {
            SourceType::Mapping(key, value) => ((**key).clone(), (**value).clone()),
            _ => {
                return vec![MoveStmt::Unsupported {
                    pattern: format!("write to `{}`", var.source_name),
                }]
            }
        };

        // Per-user resources: publish on first write, then assign through
        // a mutable global borrow at the sender's address.
        if group.per_user {
            let value_move_ty = lower_type(&value_ty, contract);
            let key = keys.first().expect("keyed write");
            let mut stmts = Vec::new();
            let mut key_result = self.transform_expecting(key, Some(&MoveType::Address));
            stmts.append(&mut key_result.pre);
            let addr = key_result.expr;
            let mut value_result = self.transform_expecting(value, Some(&value_move_ty));
            stmts.append(&mut value_result.pre);
            let value_expr = self.hoist_if_complex(value_result.expr, &mut stmts);
            self.ctx.acquires.insert(group.name.clone());

            let signer = match &self.ctx.signer_param {
                Some(signer) => signer.clone(),
                None => {
                    self.report_unsupported(
                        &format!("per-user write to `{}` without a signer", var.source_name),
                        span,
                    );
                    return vec![MoveStmt::Unsupported {
                        pattern: format!("write to `{}`", var.source_name),
                    }];
                }
            };
            let default = self
                .default_value_expr(&value_move_ty)
                .unwrap_or_else(|| MoveExpr::literal("0", MoveType::U64));
            stmts.push(MoveStmt::If {
                cond: MoveExpr::new(MoveExprKind::Not(Box::new(MoveExpr::new(
                    MoveExprKind::Exists {
                        ty: group.name.clone(),
                        addr: Box::new(addr.clone()),
                    },
                )))),
                then_block: vec![MoveStmt::Expr(MoveExpr::call(
                    None,
                    "move_to",
                    vec![
                        MoveExpr::ident(&signer),
                        MoveExpr::new(MoveExprKind::Pack {
                            name: group.name.clone(),
                            fields: vec![(PER_USER_FIELD.to_string(), default)],
                        }),
                    ],
                ))],
                else_block: None,
            });
            stmts.push(MoveStmt::Assign {
                target: MoveExpr::field(
                    MoveExpr::new(MoveExprKind::BorrowGlobal {
                        mutable: true,
                        ty: group.name.clone(),
                        addr: Box::new(addr),
                    }),
                    PER_USER_FIELD,
                ),
                value: value_expr,
            });
            return stmts;
        }

        let key_move_ty = lower_type(&key_ty, contract);
        self.ctx.require_use("table");
        let mut stmts = Vec::new();
        let first_key = keys.first().expect("keyed write");
        let mut key_result = self.transform_expecting(first_key, Some(&key_move_ty));
        stmts.append(&mut key_result.pre);
        let outer_key = key_result.expr;

        match (&value_ty, keys.len()) {
            // Nested write: ensure the inner table, then upsert into it.
            (SourceType::Mapping(inner_key, inner_value), 2) => {
                let inner_key_ty = lower_type(inner_key, contract);
                let inner_value_ty = lower_type(inner_value, contract);
                stmts.push(self.ensure_outer_entry(&var.name, &group, &outer_key));
                let mut inner_key_result = self.transform_expecting(keys[1], Some(&inner_key_ty));
                stmts.append(&mut inner_key_result.pre);
                let mut value_result = self.transform_expecting(value, Some(&inner_value_ty));
                stmts.append(&mut value_result.pre);
                let value_expr = self.hoist_if_complex(value_result.expr, &mut stmts);

                let base = self.ctx.group_var(&group, true);
                let table_expr = MoveExpr::field(base, &var.name);
                let inner_table = MoveExpr::call(
                    Some("table"),
                    "borrow_mut",
                    vec![MoveExpr::borrow(true, table_expr), outer_key],
                );
                stmts.push(MoveStmt::Expr(MoveExpr::call(
                    Some("table"),
                    "upsert",
                    vec![inner_table, inner_key_result.expr, value_expr],
                )));
                stmts
            }
            (value_source_ty, 1) => {
                let value_move_ty = lower_type(value_source_ty, contract);
                let mut value_result = self.transform_expecting(value, Some(&value_move_ty));
                stmts.append(&mut value_result.pre);
                let value_expr = self.hoist_if_complex(value_result.expr, &mut stmts);
                let base = self.ctx.group_var(&group, true);
                let table_expr = MoveExpr::field(base, &var.name);
                stmts.push(MoveStmt::Expr(MoveExpr::call(
                    Some("table"),
                    "upsert",
                    vec![
                        MoveExpr::borrow(true, table_expr),
                        outer_key,
                        value_expr,
                    ],
                )));
                stmts
            }
            _ => {
                self.report_unsupported(
                    &format!("index depth mismatch writing `{}`", var.source_name),
                    span,
                );
                vec![MoveStmt::Unsupported {
                    pattern: format!("write to `{}`", var.source_name),
                }]
            }
        }
    }

    fn lower_tuple_assign(&mut self, items: &[Expr], value: &Expr, _span: Span) -> Vec<MoveStmt> {
        let mut value_result = self.transform(value);
        let mut stmts = std::mem::take(&mut value_result.pre);
        let mut targets = Vec::new();
        for item in items {
            let result = self.transform(item);
            stmts.extend(result.pre);
            targets.push(result.expr);
        }
        stmts.push(MoveStmt::Assign {
            target: MoveExpr::new(MoveExprKind::Tuple(targets)),
            value: value_result.expr,
        });
        stmts
    }

    fn report_unsupported(&mut self, pattern: &str, span: Span) {
        self.ctx.diagnostics.push(
            Diagnostic::warning(
                DiagnosticKind::UnsupportedConstruct,
                format!("no Target lowering for {}", pattern),
            )
            .with_span(span)
            .in_contract(&self.ctx.module.contract.source_name),
        );
    }
}
