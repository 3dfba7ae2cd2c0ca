//! Source → IR lifting
//!
//! Walks a validated Source unit and produces one [`IrContract`] per
//! non-interface contract: inheritance resolved and flattened, names
//! converted to Target convention, error codes allocated, referenced
//! contracts recorded. Per-contract failures degrade gracefully — the
//! failing contract is skipped with a diagnostic and every other contract
//! still lifts.

pub mod inheritance;
pub mod naming;

use std::collections::HashMap;

use log::debug;

use crate::ast::source::{
    ContractDef, ContractKind, EnumDef, ErrorDef, EventDef, ExprKind, FunctionDef, ModifierDef,
    SourceUnit, StateVarDecl, StructDef, VarMutability,
};
use crate::ast::walk;
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::ir::{
    IrContract, IrEnum, IrEvent, IrFunction, IrModifier, IrStateVar, IrStruct,
};
use crate::runtime_shim::SHIM_MODULE_NAME;

/// Lifts Source contracts into the IR
///
/// Diagnostics accumulate across one `lift` call; the pipeline drains them
/// with [`ContractLifter::take_diagnostics`].
pub struct ContractLifter {
    diagnostics: DiagnosticBag,
}

impl Default for ContractLifter {
    fn default() -> Self {
        Self::new()
    }
}

/// One member definition paired with the contract it was inherited from
/// (`None` when the leaf contract declares it itself)
struct Flattened<T> {
    items: Vec<(T, Option<String>)>,
    index: HashMap<String, usize>,
}

impl<T> Flattened<T> {
    fn new() -> Self {
        Flattened {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert or override by name, keeping the original declaration
    /// position on override. Returns the origin of the replaced definition
    /// when one existed.
    fn insert(&mut self, name: &str, item: T, origin: Option<String>) -> Option<Option<String>> {
        match self.index.get(name).copied() {
            Some(i) => {
                let old_origin = self.items[i].1.clone();
                self.items[i] = (item, origin);
                Some(old_origin)
            }
            None => {
                self.index.insert(name.to_string(), self.items.len());
                self.items.push((item, origin));
                None
            }
        }
    }
}

impl ContractLifter {
    pub fn new() -> Self {
        ContractLifter {
            diagnostics: DiagnosticBag::new(),
        }
    }

    pub fn take_diagnostics(&mut self) -> DiagnosticBag {
        std::mem::take(&mut self.diagnostics)
    }

    /// Lift every emittable contract of the primary unit.
    ///
    /// `context` units contribute bases, libraries and constants for
    /// resolution but never emit modules themselves.
    pub fn lift(&mut self, unit: &SourceUnit, context: &[SourceUnit]) -> Vec<IrContract> {
        let mut known: HashMap<String, &ContractDef> = HashMap::new();
        for ctx in context {
            for contract in &ctx.contracts {
                known.insert(contract.name.clone(), contract);
            }
        }
        // The primary unit wins on name clashes with context sources.
        for contract in &unit.contracts {
            known.insert(contract.name.clone(), contract);
        }

        let bases_of: HashMap<String, Vec<String>> = known
            .values()
            .map(|c| (c.name.clone(), c.bases.clone()))
            .collect();

        let mut lifted = Vec::new();
        let mut module_names: HashMap<String, String> = HashMap::new();

        for contract in &unit.contracts {
            match contract.kind {
                ContractKind::Interface => {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::InterfaceSkipped,
                            format!("interface `{}` contributes no output module", contract.name),
                        )
                        .with_span(contract.span)
                        .in_contract(&contract.name),
                    );
                    continue;
                }
                ContractKind::Library => {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::ContractSkipped,
                            format!(
                                "library `{}` is flattened into its users and emits no module",
                                contract.name
                            ),
                        )
                        .in_contract(&contract.name),
                    );
                    continue;
                }
                ContractKind::Contract => {}
            }

            let ir = match self.lift_contract(contract, &known, &bases_of) {
                Some(ir) => ir,
                None => continue,
            };

            if ir.module_name == SHIM_MODULE_NAME {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::HelperModuleNameConflict,
                        format!(
                            "contract `{}` maps to reserved helper module `{}`",
                            contract.name, SHIM_MODULE_NAME
                        ),
                    )
                    .in_contract(&contract.name),
                );
                continue;
            }
            if let Some(previous) = module_names.get(&ir.module_name) {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::HelperModuleNameConflict,
                        format!(
                            "contracts `{}` and `{}` both map to module `{}`",
                            previous, contract.name, ir.module_name
                        ),
                    )
                    .in_contract(&contract.name),
                );
                continue;
            }

            module_names.insert(ir.module_name.clone(), contract.name.clone());
            debug!(
                "lifted `{}` as module `{}` ({} state vars, {} functions)",
                contract.name,
                ir.module_name,
                ir.state_vars.len(),
                ir.functions.len()
            );
            lifted.push(ir);
        }

        lifted
    }

    fn lift_contract(
        &mut self,
        contract: &ContractDef,
        known: &HashMap<String, &ContractDef>,
        bases_of: &HashMap<String, Vec<String>>,
    ) -> Option<IrContract> {
        let order = match inheritance::linearize(&contract.name, bases_of) {
            Ok(order) => order,
            Err(err) => {
                self.diagnostics.push(
                    Diagnostic::error(
                        DiagnosticKind::ContractSkipped,
                        format!("skipping `{}`: {}", contract.name, err),
                    )
                    .with_span(contract.span)
                    .in_contract(&contract.name),
                );
                return None;
            }
        };

        let mut vars: Flattened<&StateVarDecl> = Flattened::new();
        let mut functions: Flattened<&FunctionDef> = Flattened::new();
        let mut modifiers: Flattened<&ModifierDef> = Flattened::new();
        let mut events: Flattened<&EventDef> = Flattened::new();
        let mut errors: Flattened<&ErrorDef> = Flattened::new();
        let mut structs: Flattened<&StructDef> = Flattened::new();
        let mut enums: Flattened<&EnumDef> = Flattened::new();

        // Base-most first, so later (more derived) definitions override.
        for ancestor_name in order.iter().rev() {
            let ancestor = match known.get(ancestor_name) {
                Some(def) => *def,
                None => {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::UnresolvedSymbol,
                            format!(
                                "base `{}` of `{}` is not defined in this unit or its \
                                 context sources; its members are unavailable",
                                ancestor_name, contract.name
                            ),
                        )
                        .in_contract(&contract.name),
                    );
                    continue;
                }
            };
            let origin = if ancestor_name == &contract.name {
                None
            } else {
                Some(ancestor_name.clone())
            };

            for var in &ancestor.state_vars {
                vars.insert(&var.name, var, origin.clone());
            }
            for function in &ancestor.functions {
                if function.is_constructor && origin.is_some() {
                    // Base constructors run only through the leaf's.
                    continue;
                }
                let key = if function.is_constructor {
                    "constructor".to_string()
                } else {
                    function.name.clone()
                };
                if let Some(Some(loser)) = functions.insert(&key, function, origin.clone()) {
                    if let Some(winner) = &origin {
                        self.diagnostics.push(
                            Diagnostic::warning(
                                DiagnosticKind::BaseOverride,
                                format!(
                                    "`{}` is defined by both base `{}` and base `{}`; \
                                     the definition from `{}` survives",
                                    key, loser, winner, winner
                                ),
                            )
                            .in_contract(&contract.name),
                        );
                    }
                }
            }
            for modifier in &ancestor.modifiers {
                modifiers.insert(&modifier.name, modifier, origin.clone());
            }
            for event in &ancestor.events {
                events.insert(&event.name, event, origin.clone());
            }
            for error in &ancestor.errors {
                // Duplicate error codes collapse by name.
                errors.insert(&error.name, error, origin.clone());
            }
            for struct_def in &ancestor.structs {
                structs.insert(&struct_def.name, struct_def, origin.clone());
            }
            for enum_def in &ancestor.enums {
                enums.insert(&enum_def.name, enum_def, origin.clone());
            }
        }

        let mut ir = IrContract::new(
            &contract.name,
            &naming::module_name(&contract.name),
            contract.kind,
        );

        for (var, origin) in vars.items {
            ir.state_vars.push(IrStateVar {
                name: naming::member_name(&var.name),
                source_name: var.name.clone(),
                ty: var.ty.clone(),
                mutability: var.mutability,
                visibility: var.visibility,
                initial: var.initial.clone(),
                inherited_from: origin,
                span: var.span,
            });
        }

        for (function, origin) in functions.items {
            let name = if function.is_constructor {
                "initialize".to_string()
            } else {
                naming::member_name(&function.name)
            };
            ir.functions.push(IrFunction {
                name,
                source_name: function.name.clone(),
                visibility: function.visibility,
                mutability: function.mutability,
                is_constructor: function.is_constructor,
                modifiers: function.modifiers.clone(),
                params: function.params.clone(),
                returns: function.returns.clone(),
                body: function.body.clone(),
                inherited_from: origin,
                from_library: false,
                span: function.span,
            });
        }

        for (modifier, origin) in modifiers.items {
            ir.modifiers.push(IrModifier {
                name: modifier.name.clone(),
                params: modifier.params.clone(),
                body: modifier.body.clone(),
                inherited_from: origin,
                span: modifier.span,
            });
        }

        for (event, _) in events.items {
            ir.events.push(IrEvent {
                name: naming::type_name(&event.name),
                params: event.params.clone(),
                span: event.span,
            });
        }

        for (struct_def, _) in structs.items {
            ir.structs.push(IrStruct {
                name: naming::type_name(&struct_def.name),
                fields: struct_def.fields.clone(),
                span: struct_def.span,
            });
        }

        for (enum_def, _) in enums.items {
            ir.enums.push(IrEnum {
                name: naming::type_name(&enum_def.name),
                variants: enum_def.variants.clone(),
                span: enum_def.span,
            });
        }

        self.flatten_referenced_libraries(&mut ir, known);

        // Custom errors first, in declaration order, then require/revert
        // messages in body order from 256 upward.
        for (error, _) in errors.items {
            ir.error_codes.code_for_custom_error(&error.name);
        }
        self.allocate_message_codes(&mut ir);
        self.collect_referenced_contracts(&mut ir, known);

        Some(ir)
    }

    /// Flatten members of every library the contract references through
    /// qualified access (`Lib.member(…)`)
    fn flatten_referenced_libraries(
        &mut self,
        ir: &mut IrContract,
        known: &HashMap<String, &ContractDef>,
    ) {
        let mut referenced: Vec<(String, String)> = Vec::new();
        let mut record = |expr: &crate::ast::Expr| {
            if let ExprKind::Member { base, member } = &expr.kind {
                if let ExprKind::Ident { name } = &base.kind {
                    if known
                        .get(name)
                        .map(|c| c.kind == ContractKind::Library)
                        .unwrap_or(false)
                    {
                        let pair = (name.clone(), member.clone());
                        if !referenced.contains(&pair) {
                            referenced.push(pair);
                        }
                    }
                }
            }
        };
        for function in &ir.functions {
            if let Some(body) = &function.body {
                walk::visit_block_exprs(body, &mut record);
            }
        }
        for modifier in &ir.modifiers {
            walk::visit_block_exprs(&modifier.body, &mut record);
        }

        for (lib_name, member) in referenced {
            let lib = known[lib_name.as_str()];
            let qualified = format!("{}.{}", lib_name, member);
            if ir.library_members.contains_key(&qualified) {
                continue;
            }

            if let Some(function) = lib.functions.iter().find(|f| f.name == member) {
                let mut flattened_name = naming::member_name(&member);
                if ir.function(&flattened_name).is_some() {
                    flattened_name = format!(
                        "{}_{}",
                        naming::module_name(&lib_name),
                        flattened_name
                    );
                }
                ir.functions.push(IrFunction {
                    name: flattened_name.clone(),
                    source_name: function.name.clone(),
                    visibility: crate::ast::Visibility::Private,
                    mutability: function.mutability,
                    is_constructor: false,
                    modifiers: Vec::new(),
                    params: function.params.clone(),
                    returns: function.returns.clone(),
                    body: function.body.clone(),
                    inherited_from: Some(lib_name.clone()),
                    from_library: true,
                    span: function.span,
                });
                ir.library_members.insert(qualified, flattened_name);
            } else if let Some(constant) = lib
                .state_vars
                .iter()
                .find(|v| v.name == member && v.mutability == VarMutability::Constant)
            {
                let flattened_name = naming::member_name(&member);
                if ir.state_var(&flattened_name).is_none() {
                    ir.state_vars.push(IrStateVar {
                        name: flattened_name.clone(),
                        source_name: constant.name.clone(),
                        ty: constant.ty.clone(),
                        mutability: VarMutability::Constant,
                        visibility: constant.visibility,
                        initial: constant.initial.clone(),
                        inherited_from: Some(lib_name.clone()),
                        span: constant.span,
                    });
                }
                ir.library_members.insert(qualified, flattened_name);
            } else {
                self.diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::UnresolvedSymbol,
                        format!(
                            "library `{}` has no member `{}` referenced by `{}`",
                            lib_name, member, ir.source_name
                        ),
                    )
                    .in_contract(&ir.source_name),
                );
            }
        }
    }

    /// Allocate message-derived error codes in first-seen order: modifier
    /// bodies first (their requires run at function entry once inlined),
    /// then function bodies
    fn allocate_message_codes(&mut self, ir: &mut IrContract) {
        let mut messages: Vec<(bool, String)> = Vec::new();
        let collect = |block: &crate::ast::Block, messages: &mut Vec<(bool, String)>| {
            walk::visit_stmts(block, &mut |stmt| match &stmt.kind {
                crate::ast::StmtKind::Require {
                    message: Some(message),
                    ..
                } => messages.push((false, message.clone())),
                crate::ast::StmtKind::Revert { error, message, .. } => {
                    if let Some(error) = error {
                        messages.push((true, error.clone()));
                    } else if let Some(message) = message {
                        messages.push((false, message.clone()));
                    }
                }
                _ => {}
            });
        };
        for modifier in &ir.modifiers {
            collect(&modifier.body, &mut messages);
        }
        for function in &ir.functions {
            if let Some(body) = &function.body {
                collect(body, &mut messages);
            }
        }
        for (is_custom_error, text) in messages {
            if is_custom_error {
                ir.error_codes.code_for_custom_error(&text);
            } else {
                ir.error_codes.code_for_message(&text);
            }
        }
    }

    /// Record names of other known contracts this one mentions
    fn collect_referenced_contracts(
        &mut self,
        ir: &mut IrContract,
        known: &HashMap<String, &ContractDef>,
    ) {
        let mut referenced = std::mem::take(&mut ir.referenced_contracts);
        {
            let mut record = |expr: &crate::ast::Expr| match &expr.kind {
                ExprKind::Ident { name } => {
                    if name != &ir.source_name
                        && known
                            .get(name)
                            .map(|c| c.kind != ContractKind::Library)
                            .unwrap_or(false)
                    {
                        referenced.insert(name.clone());
                    }
                }
                ExprKind::Cast { ty, .. } => {
                    if let crate::ast::SourceType::Named(name) = ty {
                        if name != &ir.source_name && known.contains_key(name.as_str()) {
                            referenced.insert(name.clone());
                        }
                    }
                }
                _ => {}
            };
            for function in &ir.functions {
                if let Some(body) = &function.body {
                    walk::visit_block_exprs(body, &mut record);
                }
            }
        }
        ir.referenced_contracts = referenced;
    }
}
