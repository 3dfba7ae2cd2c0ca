//! Function transformation
//!
//! One Target function per IR function. The order of operations matters
//! and mirrors the Source semantics being collapsed:
//!
//! 1. signature synthesis (entry/view markers, signer or caller parameter);
//! 2. modifier inlining, with reentrancy-guard modifiers peeled off;
//! 3. guard insertion: assert-idle / set-locked at entry, restore before
//!    every exit;
//! 4. statement lowering with pre-statement splicing;
//! 5. write-back injection for mutated table copies at every exit;
//! 6. dead statements after a `return` are dropped.
//!
//! The constructor becomes `initialize`: assert-not-initialized, publish
//! every resource group with its initial field values, then run the lowered
//! constructor body against the freshly published state.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use crate::ast::source::{
    Block, Expr, ExprKind, FnMutability, SourceType, Stmt, StmtKind,
};
use crate::ast::Span;
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::ir::IrFunction;
use crate::lift::naming;
use crate::move_ast::{
    MoveBinOp, MoveExpr, MoveExprKind, MoveFunction, MoveStmt, MoveType, MoveVisibility,
};
use crate::transform::expression::ExpressionTransformer;
use crate::transform::{
    lower_type, reentrancy, FnSig, FunctionCtx, ModuleCtx, CALLER_PARAM, SIGNER_PARAM,
};

/// Module-level residue of transforming every function
pub struct TransformLeftovers {
    pub uses: BTreeSet<&'static str>,
    pub codes: BTreeSet<String>,
    pub diagnostics: DiagnosticBag,
}

pub struct FunctionTransformer<'m, 'a> {
    ctx: &'m ModuleCtx<'a>,
    uses: BTreeSet<&'static str>,
    codes: BTreeSet<String>,
    diagnostics: DiagnosticBag,
}

impl<'m, 'a> FunctionTransformer<'m, 'a> {
    pub fn new(ctx: &'m ModuleCtx<'a>) -> Self {
        FunctionTransformer {
            ctx,
            uses: BTreeSet::new(),
            codes: BTreeSet::new(),
            diagnostics: DiagnosticBag::new(),
        }
    }

    pub fn into_leftovers(self) -> TransformLeftovers {
        TransformLeftovers {
            uses: self.uses,
            codes: self.codes,
            diagnostics: self.diagnostics,
        }
    }

    /// Transform every function; `initialize` always comes first
    pub fn transform_all(&mut self) -> Vec<MoveFunction> {
        let mut out = Vec::new();
        out.push(self.synthesize_initialize());
        let functions: Vec<IrFunction> = self
            .ctx
            .contract
            .functions
            .iter()
            .filter(|f| !f.is_constructor)
            .cloned()
            .collect();
        for function in &functions {
            if let Some(lowered) = self.transform_function(function) {
                out.push(lowered);
            }
        }
        out
    }

    fn transform_function(&mut self, function: &IrFunction) -> Option<MoveFunction> {
        let body = match &function.body {
            Some(body) => body,
            None => {
                self.diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::UnsupportedConstruct,
                        format!(
                            "`{}` has no body and is dropped from the output",
                            function.source_name
                        ),
                    )
                    .in_contract(&self.ctx.contract.source_name),
                );
                return None;
            }
        };

        let sig = self
            .ctx
            .signature(&function.name)
            .expect("signatures are precomputed for every IR function")
            .clone();
        let read_only = matches!(function.mutability, FnMutability::View | FnMutability::Pure);
        let mut fctx = FunctionCtx::new(self.ctx, read_only);
        self.bind_params(&mut fctx, function, &sig);

        let guarded = function
            .modifiers
            .iter()
            .any(|m| reentrancy::is_guard_modifier(&m.name));
        if guarded {
            // The guard reads and writes the status field on the primary
            // group before anything else does.
            let primary = self.ctx.plan.primary().clone();
            fctx.group_var(&primary, true);
        }

        let effective = self.inline_modifiers(function, body);
        let mut body_stmts = self.declare_named_returns(&mut fctx, function);
        body_stmts.extend(self.lower_block(&mut fctx, &effective.stmts, &sig, guarded, function));

        // Fall-through exit: write-backs, guard restore, implicit return of
        // named return values.
        if !ends_in_exit(&body_stmts) {
            body_stmts.extend(fctx.origins.writeback_stmts());
            if guarded {
                body_stmts.push(self.guard_restore());
            }
            if let Some(ret) = self.implicit_return(function, &sig) {
                body_stmts.push(ret);
            }
        }

        let drained = fctx.origins.drain();
        debug!(
            "transformed fun `{}` ({} origin(s) drained)",
            function.name, drained
        );

        let mut stmts = Vec::new();
        stmts.extend(self.entry_borrows(&fctx));
        if guarded {
            stmts.extend(self.guard_prologue(&mut fctx));
        }
        stmts.extend(body_stmts);

        Some(self.finish(fctx, function, &sig, stmts))
    }

    /// Build the Target function record and absorb the context's residue
    fn finish(
        &mut self,
        fctx: FunctionCtx<'_, '_>,
        function: &IrFunction,
        sig: &FnSig,
        body: Vec<MoveStmt>,
    ) -> MoveFunction {
        self.uses.extend(fctx.uses.iter());
        self.codes.extend(fctx.used_codes.iter().cloned());
        self.diagnostics.extend(fctx.diagnostics);

        let mut params = Vec::new();
        if sig.takes_signer {
            let signer = fctx
                .signer_param
                .clone()
                .unwrap_or_else(|| SIGNER_PARAM.to_string());
            params.push((
                signer,
                MoveType::Ref {
                    mutable: false,
                    inner: Box::new(MoveType::Signer),
                },
            ));
        }
        if sig.takes_caller {
            params.push((CALLER_PARAM.to_string(), MoveType::Address));
        }
        for (name, ty) in sig.param_names.iter().zip(sig.param_types.iter()) {
            params.push((name.clone(), ty.clone()));
        }

        use crate::ast::Visibility;
        let visibility = match function.visibility {
            Visibility::Public | Visibility::External if !function.from_library => {
                MoveVisibility::Public
            }
            _ => MoveVisibility::Private,
        };

        MoveFunction {
            name: function.name.clone(),
            visibility,
            is_entry: sig.is_entry,
            is_view: sig.is_view,
            is_inline: false,
            acquires: fctx.acquires.iter().cloned().collect(),
            params,
            returns: sig.returns.clone(),
            body,
        }
    }

    fn bind_params(&mut self, fctx: &mut FunctionCtx<'_, '_>, function: &IrFunction, sig: &FnSig) {
        if sig.takes_signer {
            fctx.signer_param = Some(if function.is_constructor {
                "deployer".to_string()
            } else {
                SIGNER_PARAM.to_string()
            });
        }
        if sig.takes_caller {
            fctx.caller_param = Some(CALLER_PARAM.to_string());
        }
        for param in &function.params {
            if !param.name.is_empty() {
                fctx.locals.insert(
                    param.name.clone(),
                    lower_type(&param.ty, self.ctx.contract),
                );
            }
        }
    }

    /// Named return values become locals initialized to their defaults
    fn declare_named_returns(
        &mut self,
        fctx: &mut FunctionCtx<'_, '_>,
        function: &IrFunction,
    ) -> Vec<MoveStmt> {
        let mut stmts = Vec::new();
        for ret in &function.returns {
            if ret.name.is_empty() {
                continue;
            }
            let ty = lower_type(&ret.ty, self.ctx.contract);
            fctx.locals.insert(ret.name.clone(), ty.clone());
            stmts.push(MoveStmt::Let {
                name: naming::member_name(&ret.name),
                ty: Some(ty.clone()),
                value: self.default_for(&ty),
            });
        }
        stmts
    }

    /// Implicit return of named values when control falls off the end
    fn implicit_return(&self, function: &IrFunction, sig: &FnSig) -> Option<MoveStmt> {
        if sig.returns.is_empty() {
            return None;
        }
        let named: Vec<&str> = function
            .returns
            .iter()
            .filter(|r| !r.name.is_empty())
            .map(|r| r.name.as_str())
            .collect();
        if named.len() != function.returns.len() {
            return None;
        }
        let value = if named.len() == 1 {
            MoveExpr::ident(&naming::member_name(named[0]))
        } else {
            MoveExpr::new(MoveExprKind::Tuple(
                named
                    .iter()
                    .map(|n| MoveExpr::ident(&naming::member_name(n)))
                    .collect(),
            ))
        };
        Some(MoveStmt::Return(Some(value)))
    }

    // -------------------------------------------------------------------
    // Modifier inlining
    // -------------------------------------------------------------------

    /// Fold every applied modifier around the function body, outermost
    /// first, substituting invocation arguments for modifier parameters.
    /// Guard modifiers are peeled off; the guard itself is synthesized
    /// separately.
    fn inline_modifiers(&mut self, function: &IrFunction, body: &Block) -> Block {
        let mut current = body.clone();
        for invocation in function.modifiers.iter().rev() {
            if reentrancy::is_guard_modifier(&invocation.name) {
                continue;
            }
            let modifier = match self.ctx.contract.modifier(&invocation.name) {
                Some(modifier) => modifier.clone(),
                None => {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::UnresolvedSymbol,
                            format!(
                                "modifier `{}` on `{}` is not defined; ignored",
                                invocation.name, function.source_name
                            ),
                        )
                        .in_contract(&self.ctx.contract.source_name),
                    );
                    continue;
                }
            };

            let mut substitution: HashMap<String, Expr> = HashMap::new();
            for (param, arg) in modifier.params.iter().zip(invocation.args.iter()) {
                substitution.insert(param.name.clone(), arg.clone());
            }
            let substituted = substitute_block(&modifier.body, &substitution);
            current = splice_placeholder(&substituted, &current);
        }
        current
    }

    // -------------------------------------------------------------------
    // Reentrancy guard
    // -------------------------------------------------------------------

    fn status_field_expr(&self) -> MoveExpr {
        let primary_local = ModuleCtx::group_local(&self.ctx.plan.primary().name);
        MoveExpr::field_typed(
            MoveExpr::ident(&primary_local),
            &self.ctx.status_field,
            MoveType::U8,
        )
    }

    fn guard_prologue(&mut self, fctx: &mut FunctionCtx<'_, '_>) -> Vec<MoveStmt> {
        let status = self.status_field_expr();
        let idle = MoveExpr::literal(&reentrancy::STATUS_IDLE.to_string(), MoveType::U8);
        let locked = MoveExpr::literal(&reentrancy::STATUS_LOCKED.to_string(), MoveType::U8);
        let code = fctx.code_expr("E_REENTRANCY");
        vec![
            MoveStmt::Expr(MoveExpr::call(
                None,
                "assert!",
                vec![
                    MoveExpr::binary(MoveBinOp::Eq, status.clone(), idle),
                    code,
                ],
            )),
            MoveStmt::Assign {
                target: status,
                value: locked,
            },
        ]
    }

    fn guard_restore(&self) -> MoveStmt {
        MoveStmt::Assign {
            target: self.status_field_expr(),
            value: MoveExpr::literal(&reentrancy::STATUS_IDLE.to_string(), MoveType::U8),
        }
    }

    // -------------------------------------------------------------------
    // Statement lowering
    // -------------------------------------------------------------------

    fn lower_block(
        &mut self,
        fctx: &mut FunctionCtx<'_, '_>,
        stmts: &[Stmt],
        sig: &FnSig,
        guarded: bool,
        function: &IrFunction,
    ) -> Vec<MoveStmt> {
        let mut out = Vec::new();
        for stmt in stmts {
            self.lower_stmt(fctx, stmt, sig, guarded, function, &mut out);
            // Nothing at this level runs after an unconditional exit.
            if ends_in_exit(&out) {
                break;
            }
        }
        out
    }

    fn lower_stmt(
        &mut self,
        fctx: &mut FunctionCtx<'_, '_>,
        stmt: &Stmt,
        sig: &FnSig,
        guarded: bool,
        function: &IrFunction,
        out: &mut Vec<MoveStmt>,
    ) {
        match &stmt.kind {
            StmtKind::Block { body } | StmtKind::Unchecked { body } => {
                let lowered = self.lower_block(fctx, &body.stmts, sig, guarded, function);
                out.extend(lowered);
            }
            StmtKind::VarDecl { names, types, init } => {
                self.lower_var_decl(fctx, names, types, init.as_ref(), out);
            }
            StmtKind::Expr { expr } => match &expr.kind {
                ExprKind::Assign { op, target, value } => {
                    let mut transformer = ExpressionTransformer::new(fctx);
                    out.extend(transformer.lower_assignment(*op, target, value, expr.span));
                }
                _ => {
                    let mut transformer = ExpressionTransformer::new(fctx);
                    let result = transformer.transform(expr);
                    out.extend(result.pre);
                    out.push(MoveStmt::Expr(result.expr));
                }
            },
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_expr = {
                    let mut transformer = ExpressionTransformer::new(fctx);
                    let result = transformer.transform_expecting(cond, Some(&MoveType::Bool));
                    out.extend(result.pre);
                    result.expr
                };
                let then_block =
                    self.lower_block(fctx, &then_branch.stmts, sig, guarded, function);
                let else_block = else_branch
                    .as_ref()
                    .map(|b| self.lower_block(fctx, &b.stmts, sig, guarded, function));
                out.push(MoveStmt::If {
                    cond: cond_expr,
                    then_block,
                    else_block,
                });
            }
            StmtKind::While { cond, body } => {
                let (cond_expr, cond_pre) = {
                    let mut transformer = ExpressionTransformer::new(fctx);
                    let result = transformer.transform_expecting(cond, Some(&MoveType::Bool));
                    (result.expr, result.pre)
                };
                out.extend(cond_pre.clone());
                let mut body_stmts =
                    self.lower_block(fctx, &body.stmts, sig, guarded, function);
                // Condition pre-statements must re-run each iteration.
                body_stmts.extend(cond_pre);
                out.push(MoveStmt::While {
                    cond: cond_expr,
                    body: body_stmts,
                });
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.lower_stmt(fctx, init, sig, guarded, function, out);
                }
                let (cond_expr, cond_pre) = match cond {
                    Some(cond) => {
                        let mut transformer = ExpressionTransformer::new(fctx);
                        let result = transformer.transform_expecting(cond, Some(&MoveType::Bool));
                        (result.expr, result.pre)
                    }
                    None => (MoveExpr::bool_lit(true), Vec::new()),
                };
                out.extend(cond_pre.clone());
                let mut body_stmts =
                    self.lower_block(fctx, &body.stmts, sig, guarded, function);
                if let Some(update) = update {
                    match &update.kind {
                        ExprKind::Assign { op, target, value } => {
                            let mut transformer = ExpressionTransformer::new(fctx);
                            body_stmts.extend(
                                transformer.lower_assignment(*op, target, value, update.span),
                            );
                        }
                        _ => {
                            let mut transformer = ExpressionTransformer::new(fctx);
                            let result = transformer.transform(update);
                            body_stmts.extend(result.pre);
                            body_stmts.push(MoveStmt::Expr(result.expr));
                        }
                    }
                }
                body_stmts.extend(cond_pre);
                out.push(MoveStmt::While {
                    cond: cond_expr,
                    body: body_stmts,
                });
            }
            StmtKind::Return { values } => {
                self.lower_return(fctx, values, sig, guarded, function, out);
            }
            StmtKind::Emit { event, args } => {
                self.lower_emit(fctx, event, args, stmt.span, out);
            }
            StmtKind::Require { cond, message } => {
                let cond_expr = {
                    let mut transformer = ExpressionTransformer::new(fctx);
                    let result = transformer.transform_expecting(cond, Some(&MoveType::Bool));
                    out.extend(result.pre);
                    result.expr
                };
                let code_name = match message {
                    Some(message) => self
                        .ctx
                        .contract
                        .error_codes
                        .name_for_message(message)
                        .unwrap_or_else(|| "E_INVALID_ARGUMENT".to_string()),
                    None => "E_INVALID_ARGUMENT".to_string(),
                };
                let code = fctx.code_expr(&code_name);
                out.push(MoveStmt::Expr(MoveExpr::call(
                    None,
                    "assert!",
                    vec![cond_expr, code],
                )));
            }
            StmtKind::Revert {
                error, message, ..
            } => {
                let code_name = if let Some(error) = error {
                    let name = format!("E_{}", naming::to_screaming_snake(error));
                    if self.ctx.contract.error_codes.contains(&name) {
                        name
                    } else {
                        "E_INVALID_ARGUMENT".to_string()
                    }
                } else if let Some(message) = message {
                    self.ctx
                        .contract
                        .error_codes
                        .name_for_message(message)
                        .unwrap_or_else(|| "E_INVALID_ARGUMENT".to_string())
                } else {
                    "E_INVALID_ARGUMENT".to_string()
                };
                let code = fctx.code_expr(&code_name);
                out.push(MoveStmt::Abort(code));
            }
            StmtKind::Break => out.push(MoveStmt::Break),
            StmtKind::Continue => out.push(MoveStmt::Continue),
            // Placeholders are consumed by modifier inlining; a leftover
            // means the modifier was applied to nothing.
            StmtKind::Placeholder => {}
        }
    }

    fn lower_var_decl(
        &mut self,
        fctx: &mut FunctionCtx<'_, '_>,
        names: &[String],
        types: &[SourceType],
        init: Option<&Expr>,
        out: &mut Vec<MoveStmt>,
    ) {
        if names.len() == 1 {
            let ty = types
                .first()
                .map(|t| lower_type(t, self.ctx.contract))
                .unwrap_or(MoveType::U64);
            let target = naming::member_name(&names[0]);
            match init {
                Some(init) => {
                    let (mut result, capture) = {
                        let mut transformer = ExpressionTransformer::new(fctx);
                        transformer.transform_binding_init(init)
                    };
                    out.append(&mut result.pre);
                    if let Some(capture) = capture {
                        fctx.origins
                            .record(&target, capture.table, capture.keys, &capture.group);
                    }
                    fctx.locals.insert(names[0].clone(), ty.clone());
                    let value = {
                        let mut transformer = ExpressionTransformer::new(fctx);
                        transformer.coerce(result.expr, &ty)
                    };
                    out.push(MoveStmt::Let {
                        name: target,
                        ty: None,
                        value: Some(value),
                    });
                }
                None => {
                    fctx.locals.insert(names[0].clone(), ty.clone());
                    out.push(MoveStmt::Let {
                        name: target,
                        ty: Some(ty),
                        value: None,
                    });
                }
            }
            return;
        }

        // Tuple binding from a multi-valued call.
        let value = match init {
            Some(init) => {
                let mut transformer = ExpressionTransformer::new(fctx);
                let result = transformer.transform(init);
                out.extend(result.pre);
                result.expr
            }
            None => MoveExpr::new(MoveExprKind::Unsupported {
                pattern: "tuple declaration without initializer".to_string(),
            }),
        };
        for (name, ty) in names.iter().zip(types.iter()) {
            fctx.locals
                .insert(name.clone(), lower_type(ty, self.ctx.contract));
        }
        out.push(MoveStmt::LetTuple {
            names: names.iter().map(|n| naming::member_name(n)).collect(),
            value,
        });
    }

    fn lower_return(
        &mut self,
        fctx: &mut FunctionCtx<'_, '_>,
        values: &[Expr],
        sig: &FnSig,
        guarded: bool,
        function: &IrFunction,
        out: &mut Vec<MoveStmt>,
    ) {
        let value = match values.len() {
            0 => None,
            1 => {
                let mut transformer = ExpressionTransformer::new(fctx);
                let result =
                    transformer.transform_expecting(&values[0], sig.returns.first());
                out.extend(result.pre);
                Some(result.expr)
            }
            _ => {
                let mut lowered = Vec::new();
                for (i, value) in values.iter().enumerate() {
                    let mut transformer = ExpressionTransformer::new(fctx);
                    let result = transformer.transform_expecting(value, sig.returns.get(i));
                    out.extend(result.pre);
                    lowered.push(result.expr);
                }
                Some(MoveExpr::new(MoveExprKind::Tuple(lowered)))
            }
        };

        // Exit path: write-backs first, then the guard unlock, then the
        // return itself.
        out.extend(fctx.origins.writeback_stmts());
        if guarded {
            out.push(self.guard_restore());
        }

        let value = match (value, values.is_empty()) {
            (Some(value), _) => Some(value),
            (None, true) if !sig.returns.is_empty() => {
                // Bare `return;` with named returns yields the named
                // locals.
                match self.implicit_return(function, sig) {
                    Some(MoveStmt::Return(value)) => value,
                    _ => None,
                }
            }
            (None, _) => None,
        };
        out.push(MoveStmt::Return(value));
    }

    fn lower_emit(
        &mut self,
        fctx: &mut FunctionCtx<'_, '_>,
        event: &str,
        args: &[Expr],
        span: Span,
        out: &mut Vec<MoveStmt>,
    ) {
        let event_name = naming::type_name(event);
        let event_def = match self.ctx.contract.events.iter().find(|e| e.name == event_name) {
            Some(event_def) => event_def.clone(),
            None => {
                self.diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::UnresolvedSymbol,
                        format!("emit of undeclared event `{}`", event),
                    )
                    .with_span(span)
                    .in_contract(&self.ctx.contract.source_name),
                );
                out.push(MoveStmt::Unsupported {
                    pattern: format!("emit {}", event),
                });
                return;
            }
        };

        // Event structs are renamed when they collide with a data struct;
        // mirror the struct builder's choice.
        let struct_name = if self.ctx.contract.struct_def(&event_name).is_some() {
            format!("{}Event", event_name)
        } else {
            event_name
        };

        let mut fields = Vec::new();
        for (i, param) in event_def.params.iter().enumerate() {
            let expected = lower_type(&param.ty, self.ctx.contract);
            let value = match args.get(i) {
                Some(arg) => {
                    let mut transformer = ExpressionTransformer::new(fctx);
                    let result = transformer.transform_expecting(arg, Some(&expected));
                    out.extend(result.pre);
                    result.expr
                }
                None => MoveExpr::new(MoveExprKind::Unsupported {
                    pattern: format!("missing event argument `{}`", param.name),
                }),
            };
            fields.push((naming::member_name(&param.name), value));
        }

        fctx.require_use("event");
        out.push(MoveStmt::Expr(MoveExpr::call(
            Some("event"),
            "emit",
            vec![MoveExpr::new(MoveExprKind::Pack {
                name: struct_name,
                fields,
            })],
        )));
    }

    // -------------------------------------------------------------------
    // Entry borrows and initialize
    // -------------------------------------------------------------------

    /// `let <group> = borrow_global_mut<Group>(@addr);` for every borrowed
    /// group, in plan order
    fn entry_borrows(&self, fctx: &FunctionCtx<'_, '_>) -> Vec<MoveStmt> {
        let mut out = Vec::new();
        for group in &self.ctx.plan.groups {
            if group.per_user {
                continue;
            }
            if let Some(mutable) = fctx.groups.get(&group.name) {
                out.push(MoveStmt::Let {
                    name: ModuleCtx::group_local(&group.name),
                    ty: None,
                    value: Some(MoveExpr::new(MoveExprKind::BorrowGlobal {
                        mutable: *mutable,
                        ty: group.name.clone(),
                        addr: Box::new(MoveExpr::address_lit(
                            &self.ctx.options.module_address,
                        )),
                    })),
                });
            }
        }
        out
    }

    /// The constructor (or its absence) becomes `initialize`
    fn synthesize_initialize(&mut self) -> MoveFunction {
        let constructor = self.ctx.contract.constructor().cloned();
        let primary_name = self.ctx.plan.primary().name.clone();

        let sig = match &constructor {
            Some(ctor) => self
                .ctx
                .signature(&ctor.name)
                .expect("constructor signature is precomputed")
                .clone(),
            None => FnSig {
                takes_signer: true,
                takes_caller: false,
                is_entry: true,
                is_view: false,
                param_names: Vec::new(),
                param_types: Vec::new(),
                returns: Vec::new(),
            },
        };

        let mut fctx = FunctionCtx::new(self.ctx, false);
        fctx.signer_param = Some("deployer".to_string());
        if let Some(ctor) = &constructor {
            for param in &ctor.params {
                if !param.name.is_empty() {
                    fctx.locals.insert(
                        param.name.clone(),
                        lower_type(&param.ty, self.ctx.contract),
                    );
                }
            }
        }

        let mut preamble = Vec::new();
        let code = fctx.code_expr("E_ALREADY_INITIALIZED");
        preamble.push(MoveStmt::Expr(MoveExpr::call(
            None,
            "assert!",
            vec![
                MoveExpr::new(MoveExprKind::Not(Box::new(MoveExpr::new(
                    MoveExprKind::Exists {
                        ty: primary_name,
                        addr: Box::new(MoveExpr::address_lit(
                            &self.ctx.options.module_address,
                        )),
                    },
                )))),
                code,
            ],
        )));
        preamble.extend(self.publish_groups(&mut fctx));

        let body_stmts = match &constructor {
            Some(ctor) => match &ctor.body {
                Some(body) => self.lower_block(&mut fctx, &body.stmts, &sig, false, ctor),
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        let drained = fctx.origins.drain();
        debug!("synthesized initialize ({} origin(s) drained)", drained);

        let mut stmts = preamble;
        stmts.extend(self.entry_borrows(&fctx));
        stmts.extend(body_stmts);

        let placeholder = IrFunction {
            name: "initialize".to_string(),
            source_name: "constructor".to_string(),
            visibility: crate::ast::Visibility::Public,
            mutability: FnMutability::Nonpayable,
            is_constructor: true,
            modifiers: Vec::new(),
            params: constructor.as_ref().map(|c| c.params.clone()).unwrap_or_default(),
            returns: Vec::new(),
            body: None,
            inherited_from: None,
            from_library: false,
            span: Span::none(),
        };
        self.finish(fctx, &placeholder, &sig, stmts)
    }

    /// `move_to` every module-address group with initial field values
    fn publish_groups(&mut self, fctx: &mut FunctionCtx<'_, '_>) -> Vec<MoveStmt> {
        let contract = self.ctx.contract;
        let plan = self.ctx.plan;
        let signer = fctx
            .signer_param
            .clone()
            .expect("initialize always takes the deployer");

        let mut out = Vec::new();
        for group in &plan.groups {
            if group.per_user {
                // Per-user resources are published lazily, at first write.
                continue;
            }
            let mut fields = Vec::new();
            for var_name in &group.vars {
                let var = match contract.state_var(var_name) {
                    Some(var) => var.clone(),
                    None => continue,
                };
                let ty = lower_type(&var.ty, contract);
                let value = match &var.initial {
                    Some(initial) => {
                        let mut transformer = ExpressionTransformer::new(fctx);
                        let result = transformer.transform_expecting(initial, Some(&ty));
                        out.extend(result.pre);
                        result.expr
                    }
                    // A declared reentrancy status field starts idle, not
                    // zero; the guard asserts against the idle sentinel.
                    None if self.ctx.needs_guard && var.name == self.ctx.status_field => {
                        MoveExpr::literal(&reentrancy::STATUS_IDLE.to_string(), ty.clone())
                    }
                    None => self
                        .default_for(&ty)
                        .unwrap_or_else(|| MoveExpr::new(MoveExprKind::Unsupported {
                            pattern: format!("default for `{}`", var.source_name),
                        })),
                };
                fields.push((var.name.clone(), value));
            }
            if group.is_primary && self.ctx.needs_guard && !self.ctx.status_field_declared {
                fields.push((
                    self.ctx.status_field.clone(),
                    MoveExpr::literal(&reentrancy::STATUS_IDLE.to_string(), MoveType::U8),
                ));
            }
            if group.is_primary && fields.is_empty() {
                fields.push(("dummy_field".to_string(), MoveExpr::bool_lit(false)));
            }
            if fields.is_empty() {
                continue;
            }
            out.push(MoveStmt::Expr(MoveExpr::call(
                None,
                "move_to",
                vec![
                    MoveExpr::ident(&signer),
                    MoveExpr::new(MoveExprKind::Pack {
                        name: group.name.clone(),
                        fields,
                    }),
                ],
            )));
        }
        out
    }

    /// Default value for a Target type, tables and structs included
    fn default_for(&mut self, ty: &MoveType) -> Option<MoveExpr> {
        match ty {
            _ if ty.is_integer() => Some(MoveExpr::literal("0", ty.clone())),
            MoveType::Bool => Some(MoveExpr::bool_lit(false)),
            MoveType::Address => Some(MoveExpr::address_lit("0x0")),
            MoveType::Vector(_) => Some(MoveExpr::typed(
                MoveExprKind::VectorLit(Vec::new()),
                ty.clone(),
            )),
            MoveType::String => {
                self.uses.insert("string");
                Some(
                    MoveExpr::call(
                        Some("string"),
                        "utf8",
                        vec![MoveExpr::new(MoveExprKind::ByteStringLit(String::new()))],
                    )
                    .with_type(MoveType::String),
                )
            }
            MoveType::Table(_, _) => {
                self.uses.insert("table");
                Some(
                    MoveExpr::call(Some("table"), "new", Vec::new()).with_type(ty.clone()),
                )
            }
            MoveType::Struct(name) => {
                let struct_def = self.ctx.contract.struct_def(name)?;
                let fields = struct_def.fields.clone();
                let mut lowered = Vec::new();
                for field in &fields {
                    let field_ty = lower_type(&field.ty, self.ctx.contract);
                    lowered.push((
                        naming::member_name(&field.name),
                        self.default_for(&field_ty)?,
                    ));
                }
                Some(MoveExpr::new(MoveExprKind::Pack {
                    name: name.clone(),
                    fields: lowered,
                }))
            }
            _ => None,
        }
    }
}

/// True when the statement list cannot fall through its end
fn ends_in_exit(stmts: &[MoveStmt]) -> bool {
    matches!(
        stmts.last(),
        Some(MoveStmt::Return(_)) | Some(MoveStmt::Abort(_))
    )
}

/// Clone a block, replacing parameter identifiers with invocation
/// arguments
fn substitute_block(block: &Block, map: &HashMap<String, Expr>) -> Block {
    if map.is_empty() {
        return block.clone();
    }
    Block {
        stmts: block.stmts.iter().map(|s| substitute_stmt(s, map)).collect(),
        span: block.span,
    }
}

fn substitute_stmt(stmt: &Stmt, map: &HashMap<String, Expr>) -> Stmt {
    let kind = match &stmt.kind {
        StmtKind::Block { body } => StmtKind::Block {
            body: substitute_block(body, map),
        },
        StmtKind::Unchecked { body } => StmtKind::Unchecked {
            body: substitute_block(body, map),
        },
        StmtKind::VarDecl { names, types, init } => StmtKind::VarDecl {
            names: names.clone(),
            types: types.clone(),
            init: init.as_ref().map(|e| substitute_expr(e, map)),
        },
        StmtKind::Expr { expr } => StmtKind::Expr {
            expr: substitute_expr(expr, map),
        },
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => StmtKind::If {
            cond: substitute_expr(cond, map),
            then_branch: substitute_block(then_branch, map),
            else_branch: else_branch.as_ref().map(|b| substitute_block(b, map)),
        },
        StmtKind::While { cond, body } => StmtKind::While {
            cond: substitute_expr(cond, map),
            body: substitute_block(body, map),
        },
        StmtKind::For {
            init,
            cond,
            update,
            body,
        } => StmtKind::For {
            init: init
                .as_ref()
                .map(|s| Box::new(substitute_stmt(s, map))),
            cond: cond.as_ref().map(|e| substitute_expr(e, map)),
            update: update.as_ref().map(|e| substitute_expr(e, map)),
            body: substitute_block(body, map),
        },
        StmtKind::Return { values } => StmtKind::Return {
            values: values.iter().map(|e| substitute_expr(e, map)).collect(),
        },
        StmtKind::Emit { event, args } => StmtKind::Emit {
            event: event.clone(),
            args: args.iter().map(|e| substitute_expr(e, map)).collect(),
        },
        StmtKind::Require { cond, message } => StmtKind::Require {
            cond: substitute_expr(cond, map),
            message: message.clone(),
        },
        StmtKind::Revert {
            error,
            message,
            args,
        } => StmtKind::Revert {
            error: error.clone(),
            message: message.clone(),
            args: args.iter().map(|e| substitute_expr(e, map)).collect(),
        },
        other => other.clone(),
    };
    Stmt { kind, span: stmt.span }
}

fn substitute_expr(expr: &Expr, map: &HashMap<String, Expr>) -> Expr {
    let kind = match &expr.kind {
        ExprKind::Ident { name } => {
            if let Some(replacement) = map.get(name) {
                return replacement.clone();
            }
            ExprKind::Ident { name: name.clone() }
        }
        ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
            op: *op,
            lhs: Box::new(substitute_expr(lhs, map)),
            rhs: Box::new(substitute_expr(rhs, map)),
        },
        ExprKind::Unary { op, operand } => ExprKind::Unary {
            op: *op,
            operand: Box::new(substitute_expr(operand, map)),
        },
        ExprKind::Assign { op, target, value } => ExprKind::Assign {
            op: *op,
            target: Box::new(substitute_expr(target, map)),
            value: Box::new(substitute_expr(value, map)),
        },
        ExprKind::Index { base, index } => ExprKind::Index {
            base: Box::new(substitute_expr(base, map)),
            index: Box::new(substitute_expr(index, map)),
        },
        ExprKind::Member { base, member } => ExprKind::Member {
            base: Box::new(substitute_expr(base, map)),
            member: member.clone(),
        },
        ExprKind::Call { callee, args } => ExprKind::Call {
            callee: Box::new(substitute_expr(callee, map)),
            args: args.iter().map(|a| substitute_expr(a, map)).collect(),
        },
        ExprKind::Tuple { items } => ExprKind::Tuple {
            items: items.iter().map(|i| substitute_expr(i, map)).collect(),
        },
        ExprKind::Conditional {
            cond,
            then_value,
            else_value,
        } => ExprKind::Conditional {
            cond: Box::new(substitute_expr(cond, map)),
            then_value: Box::new(substitute_expr(then_value, map)),
            else_value: Box::new(substitute_expr(else_value, map)),
        },
        ExprKind::Cast { ty, value } => ExprKind::Cast {
            ty: ty.clone(),
            value: Box::new(substitute_expr(value, map)),
        },
        other => other.clone(),
    };
    Expr {
        kind,
        span: expr.span,
    }
}

/// Replace every `_;` placeholder with the wrapped body
fn splice_placeholder(modifier_body: &Block, inner: &Block) -> Block {
    let mut stmts = Vec::new();
    for stmt in &modifier_body.stmts {
        match &stmt.kind {
            StmtKind::Placeholder => stmts.extend(inner.stmts.iter().cloned()),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => stmts.push(Stmt {
                kind: StmtKind::If {
                    cond: cond.clone(),
                    then_branch: splice_placeholder(then_branch, inner),
                    else_branch: else_branch
                        .as_ref()
                        .map(|b| splice_placeholder(b, inner)),
                },
                span: stmt.span,
            }),
            StmtKind::Block { body } => stmts.push(Stmt {
                kind: StmtKind::Block {
                    body: splice_placeholder(body, inner),
                },
                span: stmt.span,
            }),
            _ => stmts.push(stmt.clone()),
        }
    }
    Block {
        stmts,
        span: modifier_body.span,
    }
}
