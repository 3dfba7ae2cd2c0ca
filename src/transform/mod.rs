//! IR → Target transformation
//!
//! The back half of the pipeline. [`ContractTransformer`] assembles one
//! Move module per IR contract: resource structs from the analyzer's plan,
//! data and event structs, constants, and one Target function per IR
//! function (plus the synthesized `initialize`). The per-expression work
//! lives in [`expression`], the per-function work in [`function`].
//!
//! Shared state is explicit: [`ModuleCtx`] is read-only module-wide
//! knowledge (signatures, the resource plan, the reentrancy field), while
//! [`FunctionCtx`] owns everything mutable during one function's
//! transformation — borrowed groups, table-copy origins, required `use`s,
//! referenced error codes, diagnostics.

pub mod expression;
pub mod function;
pub mod reentrancy;
pub mod standards;
pub mod table_copy;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;

use crate::analysis::{ResourceGroup, ResourcePlan};
use crate::ast::source::{FnMutability, SourceType, Visibility};
use crate::ast::walk;
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticKind};
use crate::ir::{IrContract, IrFunction, IrStateVar};
use crate::lift::naming;
use crate::move_ast::{
    AbilitySet, ConstantDef, MoveExpr, MoveField, MoveModule, MoveStructDef, MoveType,
};
use crate::options::TranspileOptions;
use crate::printer;
use table_copy::TableCopyOrigins;

/// Name of the signer parameter on mutating functions
pub const SIGNER_PARAM: &str = "account";

/// Name of the address parameter on sender-dependent view functions
pub const CALLER_PARAM: &str = "caller";

/// Field name of single-variable per-user resources
pub const PER_USER_FIELD: &str = "value";

/// Lower a Source type onto the Target type lattice
pub fn lower_type(ty: &SourceType, contract: &IrContract) -> MoveType {
    match ty {
        SourceType::Uint(bits) | SourceType::Int(bits) => MoveType::integer_of_width(*bits),
        SourceType::Bool => MoveType::Bool,
        SourceType::Address | SourceType::AddressPayable => MoveType::Address,
        SourceType::Str => MoveType::String,
        SourceType::Bytes | SourceType::FixedBytes(_) => MoveType::Vector(Box::new(MoveType::U8)),
        SourceType::Mapping(key, value) => MoveType::Table(
            Box::new(lower_type(key, contract)),
            Box::new(lower_type(value, contract)),
        ),
        SourceType::Array(elem, _) => MoveType::Vector(Box::new(lower_type(elem, contract))),
        SourceType::Named(name) => {
            let target_name = naming::type_name(name);
            if contract.struct_def(&target_name).is_some() {
                MoveType::Struct(target_name)
            } else if contract.enum_def(&target_name).is_some() {
                MoveType::U8
            } else if contract.referenced_contracts.contains(name) {
                // Contract references are account addresses on the Target.
                MoveType::Address
            } else {
                MoveType::Struct(target_name)
            }
        }
    }
}

/// Pre-computed Target signature of one function, visible to call sites
/// before the callee's body is transformed
#[derive(Debug, Clone)]
pub struct FnSig {
    pub takes_signer: bool,
    pub takes_caller: bool,
    pub is_entry: bool,
    pub is_view: bool,
    pub param_names: Vec<String>,
    pub param_types: Vec<MoveType>,
    pub returns: Vec<MoveType>,
}

/// Read-only module-wide knowledge shared by every function transform
pub struct ModuleCtx<'a> {
    pub contract: &'a IrContract,
    pub plan: &'a ResourcePlan,
    pub options: &'a TranspileOptions,
    pub signatures: HashMap<String, FnSig>,
    /// Reentrancy status field name and whether the Source declared it
    pub status_field: String,
    pub status_field_declared: bool,
    /// Some function carries a guard modifier
    pub needs_guard: bool,
}

impl<'a> ModuleCtx<'a> {
    pub fn new(
        contract: &'a IrContract,
        plan: &'a ResourcePlan,
        options: &'a TranspileOptions,
    ) -> Self {
        let needs_guard = contract.functions.iter().any(|f| {
            f.modifiers
                .iter()
                .any(|m| reentrancy::is_guard_modifier(&m.name))
        });
        let (status_field, status_field_declared) =
            reentrancy::status_field_for(contract.state_vars.iter().map(|v| v.source_name.as_str()));

        let mut ctx = ModuleCtx {
            contract,
            plan,
            options,
            signatures: HashMap::new(),
            status_field,
            status_field_declared,
            needs_guard,
        };
        ctx.signatures = compute_signatures(&ctx);
        ctx
    }

    pub fn signature(&self, ir_name: &str) -> Option<&FnSig> {
        self.signatures.get(ir_name)
    }

    /// The local variable a borrowed group is bound to
    pub fn group_local(group_name: &str) -> String {
        naming::to_snake_case(group_name)
    }
}

/// Everything mutable while one function transforms
pub struct FunctionCtx<'m, 'a> {
    pub module: &'m ModuleCtx<'a>,
    /// View/pure functions may not mutate global state
    pub read_only: bool,
    /// Source-side local and parameter names → Target types
    pub locals: HashMap<String, MoveType>,
    pub signer_param: Option<String>,
    pub caller_param: Option<String>,
    /// Groups the body borrowed at the module address → needs `&mut`
    pub groups: BTreeMap<String, bool>,
    /// Every resource named in `acquires`, per-user groups included
    pub acquires: BTreeSet<String>,
    pub origins: TableCopyOrigins,
    pub used_codes: BTreeSet<String>,
    /// Keys into [`use_decl_for`]
    pub uses: BTreeSet<&'static str>,
    pub diagnostics: DiagnosticBag,
    temp_counter: u32,
}

impl<'m, 'a> FunctionCtx<'m, 'a> {
    pub fn new(module: &'m ModuleCtx<'a>, read_only: bool) -> Self {
        FunctionCtx {
            module,
            read_only,
            locals: HashMap::new(),
            signer_param: None,
            caller_param: None,
            groups: BTreeMap::new(),
            acquires: BTreeSet::new(),
            origins: TableCopyOrigins::new(),
            used_codes: BTreeSet::new(),
            uses: BTreeSet::new(),
            diagnostics: DiagnosticBag::new(),
            temp_counter: 0,
        }
    }

    pub fn require_use(&mut self, key: &'static str) {
        self.uses.insert(key);
    }

    pub fn fresh_temp(&mut self, base: &str) -> String {
        self.temp_counter += 1;
        format!("{}_{}", base, self.temp_counter)
    }

    /// Reference an error-code constant, marking it used
    pub fn code_expr(&mut self, name: &str) -> MoveExpr {
        self.used_codes.insert(name.to_string());
        MoveExpr::ident_typed(name, MoveType::U64)
    }

    /// The Target expression for the transaction sender's address
    pub fn sender_expr(&mut self) -> MoveExpr {
        if let Some(caller) = &self.caller_param {
            return MoveExpr::ident_typed(caller, MoveType::Address);
        }
        let signer = self
            .signer_param
            .clone()
            .unwrap_or_else(|| SIGNER_PARAM.to_string());
        self.require_use("signer");
        MoveExpr::call(
            Some("signer"),
            "address_of",
            vec![MoveExpr::ident(&signer)],
        )
        .with_type(MoveType::Address)
    }

    /// Bind a module-address group borrow, upgrading to `&mut` on demand,
    /// and return the local it is bound to
    pub fn group_var(&mut self, group: &ResourceGroup, mutable: bool) -> MoveExpr {
        let entry = self.groups.entry(group.name.clone()).or_insert(false);
        *entry = *entry || mutable;
        self.acquires.insert(group.name.clone());
        MoveExpr::ident(&ModuleCtx::group_local(&group.name))
    }

    /// Field access for a state variable inside its (non-per-user) group
    pub fn state_field(&mut self, var: &IrStateVar, mutable: bool) -> Option<MoveExpr> {
        let group = self.module.plan.group_of(&var.name)?.clone();
        if group.per_user {
            return None;
        }
        let base = self.group_var(&group, mutable);
        let ty = lower_type(&var.ty, self.module.contract);
        Some(MoveExpr::field_typed(base, &var.name, ty))
    }

    pub fn module_address_expr(&self) -> MoveExpr {
        MoveExpr::address_lit(&self.module.options.module_address)
    }
}

/// Compute Target signatures for every function before any body transforms
fn compute_signatures(ctx: &ModuleCtx<'_>) -> HashMap<String, FnSig> {
    let mut signatures = HashMap::new();
    for function in &ctx.contract.functions {
        signatures.insert(function.name.clone(), signature_for(ctx, function));
    }
    signatures
}

fn signature_for(ctx: &ModuleCtx<'_>, function: &IrFunction) -> FnSig {
    let view_like = matches!(function.mutability, FnMutability::View | FnMutability::Pure);
    let uses_sender = function_uses_sender(ctx, function);

    let takes_signer = function.is_constructor || (!view_like && uses_sender);
    let takes_caller = view_like && uses_sender;
    let exported = matches!(function.visibility, Visibility::Public | Visibility::External)
        && !function.from_library;
    let is_view = exported && function.mutability == FnMutability::View;
    let is_entry =
        (exported && !view_like && function.returns.is_empty()) || function.is_constructor;

    let mut param_names = Vec::new();
    let mut param_types = Vec::new();
    for (i, param) in function.params.iter().enumerate() {
        let name = if param.name.is_empty() {
            format!("arg{}", i)
        } else {
            naming::member_name(&param.name)
        };
        param_names.push(name);
        param_types.push(lower_type(&param.ty, ctx.contract));
    }
    let returns = function
        .returns
        .iter()
        .map(|r| lower_type(&r.ty, ctx.contract))
        .collect();

    FnSig {
        takes_signer,
        takes_caller,
        is_entry,
        is_view,
        param_names,
        param_types,
        returns,
    }
}

/// The function (or one of its applied modifiers) mentions the sender
fn function_uses_sender(ctx: &ModuleCtx<'_>, function: &IrFunction) -> bool {
    let mut found = false;
    if let Some(body) = &function.body {
        walk::visit_block_exprs(body, &mut |expr| {
            if expr.is_msg_sender() {
                found = true;
            }
        });
    }
    if found {
        return true;
    }
    for invocation in &function.modifiers {
        if let Some(modifier) = ctx.contract.modifier(&invocation.name) {
            walk::visit_block_exprs(&modifier.body, &mut |expr| {
                if expr.is_msg_sender() {
                    found = true;
                }
            });
        }
    }
    found
}

/// `use` declaration for each key a function context can require
pub fn use_decl_for(key: &str) -> Option<(&'static str, &'static [&'static str])> {
    match key {
        "signer" => Some(("std::signer", &[])),
        "string" => Some(("std::string", &[])),
        "vector" => Some(("std::vector", &[])),
        "hash" => Some(("std::hash", &[])),
        "table" => Some(("aptos_std::table", &["Self", "Table"])),
        "aptos_hash" => Some(("aptos_std::aptos_hash", &[])),
        "math64" => Some(("aptos_std::math64", &[])),
        "math128" => Some(("aptos_std::math128", &[])),
        "event" => Some(("aptos_framework::event", &[])),
        "timestamp" => Some(("aptos_framework::timestamp", &[])),
        "block" => Some(("aptos_framework::block", &[])),
        "object" => Some(("aptos_framework::object", &["Self", "Object"])),
        "fungible_asset" => Some((
            "aptos_framework::fungible_asset",
            &["Self", "Metadata", "MintRef", "BurnRef", "TransferRef"],
        )),
        "primary_fungible_store" => Some(("aptos_framework::primary_fungible_store", &[])),
        "option" => Some(("std::option", &[])),
        "sol_runtime" => Some(("sol_runtime::sol_runtime", &[])),
        _ => None,
    }
}

/// Assembles one Move module per IR contract
pub struct ContractTransformer<'a> {
    options: &'a TranspileOptions,
    diagnostics: DiagnosticBag,
}

impl<'a> ContractTransformer<'a> {
    pub fn new(options: &'a TranspileOptions) -> Self {
        ContractTransformer {
            options,
            diagnostics: DiagnosticBag::new(),
        }
    }

    pub fn take_diagnostics(&mut self) -> DiagnosticBag {
        std::mem::take(&mut self.diagnostics)
    }

    /// Transform one contract against its resource plan
    pub fn transform(&mut self, contract: &IrContract, plan: &ResourcePlan) -> MoveModule {
        let ctx = ModuleCtx::new(contract, plan, self.options);
        let mut module = MoveModule::new(&self.options.module_address, &contract.module_name);

        self.warn_nonstandard_widths(contract);
        self.build_structs(&ctx, &mut module);
        self.build_enum_constants(contract, &mut module);

        let mut all_uses: BTreeSet<&'static str> = BTreeSet::new();
        let mut used_codes: BTreeSet<String> = BTreeSet::new();

        self.build_value_constants(&ctx, &mut module, &mut all_uses);

        let mut transformer = function::FunctionTransformer::new(&ctx);
        for target_fn in transformer.transform_all() {
            module.functions.push(target_fn);
        }
        let function::TransformLeftovers {
            uses,
            codes,
            diagnostics,
        } = transformer.into_leftovers();
        all_uses.extend(uses);
        used_codes.extend(codes);
        self.diagnostics.extend(diagnostics);

        self.build_error_constants(contract, &used_codes, &mut module);

        for key in all_uses {
            if let Some((path, members)) = use_decl_for(key) {
                module.add_use(path, members);
            }
        }

        debug!(
            "transformed `{}`: {} structs, {} functions, {} constants",
            module.name,
            module.structs.len(),
            module.functions.len(),
            module.constants.len()
        );
        module
    }

    fn warn_nonstandard_widths(&mut self, contract: &IrContract) {
        let mut warned_signed = false;
        for var in &contract.state_vars {
            match &var.ty {
                SourceType::Int(_) if !warned_signed => {
                    warned_signed = true;
                    self.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::SignedIntegerLowered,
                            format!(
                                "signed integers have no Target counterpart; `{}` and any \
                                 other signed variables are lowered to unsigned widths",
                                var.source_name
                            ),
                        )
                        .in_contract(&contract.source_name),
                    );
                }
                SourceType::Uint(bits) if MoveType::integer_of_width(*bits).width_bits() != Some(*bits) => {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::NonStandardWidth,
                            format!(
                                "`{}`: uint{} rounds up to the next Target width",
                                var.source_name, bits
                            ),
                        )
                        .in_contract(&contract.source_name),
                    );
                }
                SourceType::Array(_, Some(len)) => {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::FixedArrayLength,
                            format!(
                                "`{}`: fixed length {} is not enforced on the Target vector",
                                var.source_name, len
                            ),
                        )
                        .in_contract(&contract.source_name),
                    );
                }
                _ => {}
            }
        }
    }

    fn build_structs(&mut self, ctx: &ModuleCtx<'_>, module: &mut MoveModule) {
        let contract = ctx.contract;

        for group in &ctx.plan.groups {
            if group.per_user {
                // Per-user resources hold the mapping's value type at the
                // user's own address.
                let var = group
                    .vars
                    .first()
                    .and_then(|name| contract.state_var(name));
                let value_ty = match var.map(|v| &v.ty) {
                    Some(SourceType::Mapping(_, value)) => lower_type(value, contract),
                    _ => MoveType::U64,
                };
                module.structs.push(MoveStructDef {
                    name: group.name.clone(),
                    abilities: AbilitySet::resource(),
                    fields: vec![MoveField {
                        name: PER_USER_FIELD.to_string(),
                        ty: value_ty,
                    }],
                    is_event: false,
                });
                continue;
            }

            let mut fields: Vec<MoveField> = group
                .vars
                .iter()
                .filter_map(|name| contract.state_var(name))
                .map(|var| MoveField {
                    name: var.name.clone(),
                    ty: lower_type(&var.ty, contract),
                })
                .collect();

            if group.is_primary && ctx.needs_guard && !ctx.status_field_declared {
                fields.push(MoveField {
                    name: ctx.status_field.clone(),
                    ty: MoveType::U8,
                });
            }
            if group.is_primary && fields.is_empty() {
                fields.push(MoveField {
                    name: "dummy_field".to_string(),
                    ty: MoveType::Bool,
                });
            }
            if fields.is_empty() {
                continue;
            }
            module.structs.push(MoveStructDef {
                name: group.name.clone(),
                abilities: AbilitySet::resource(),
                fields,
                is_event: false,
            });
        }

        for struct_def in &contract.structs {
            module.structs.push(MoveStructDef {
                name: struct_def.name.clone(),
                abilities: AbilitySet::data(),
                fields: struct_def
                    .fields
                    .iter()
                    .map(|field| MoveField {
                        name: naming::member_name(&field.name),
                        ty: lower_type(&field.ty, contract),
                    })
                    .collect(),
                is_event: false,
            });
        }

        for event in &contract.events {
            let name = if module.find_struct(&event.name).is_some() {
                format!("{}Event", event.name)
            } else {
                event.name.clone()
            };
            module.structs.push(MoveStructDef {
                name,
                abilities: AbilitySet::event(),
                fields: event
                    .params
                    .iter()
                    .map(|param| MoveField {
                        name: naming::member_name(&param.name),
                        ty: lower_type(&param.ty, contract),
                    })
                    .collect(),
                is_event: true,
            });
        }
    }

    /// Source enums become `u8` constants, one per variant
    fn build_enum_constants(&mut self, contract: &IrContract, module: &mut MoveModule) {
        for enum_def in &contract.enums {
            for (i, variant) in enum_def.variants.iter().enumerate() {
                module.constants.push(ConstantDef {
                    name: format!(
                        "{}_{}",
                        naming::to_screaming_snake(&enum_def.name),
                        naming::to_screaming_snake(variant)
                    ),
                    ty: MoveType::U8,
                    value: i.to_string(),
                    doc: None,
                });
            }
        }
    }

    /// Source `constant` variables become Target constants
    fn build_value_constants(
        &mut self,
        ctx: &ModuleCtx<'_>,
        module: &mut MoveModule,
        all_uses: &mut BTreeSet<&'static str>,
    ) {
        use crate::ast::VarMutability;

        for var in &ctx.contract.state_vars {
            if var.mutability != VarMutability::Constant {
                continue;
            }
            let initial = match &var.initial {
                Some(initial) => initial,
                None => {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::UnsupportedConstruct,
                            format!("constant `{}` has no initializer; skipped", var.source_name),
                        )
                        .in_contract(&ctx.contract.source_name),
                    );
                    continue;
                }
            };

            let ty = lower_type(&var.ty, ctx.contract);
            let mut fn_ctx = FunctionCtx::new(ctx, true);
            let mut transformer = expression::ExpressionTransformer::new(&mut fn_ctx);
            let result = transformer.transform_expecting(initial, Some(&ty));
            let value = printer::render_expr(&result.expr, &printer::PrinterOptions::default());
            if !result.pre.is_empty() || !fn_ctx.groups.is_empty() {
                self.diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::UnsupportedConstruct,
                        format!(
                            "constant `{}` initializer is not a constant expression; skipped",
                            var.source_name
                        ),
                    )
                    .in_contract(&ctx.contract.source_name),
                );
                continue;
            }
            all_uses.extend(fn_ctx.uses.iter());
            self.diagnostics.extend(fn_ctx.diagnostics);
            module.constants.push(ConstantDef {
                name: var.name.clone(),
                ty,
                value,
                doc: None,
            });
        }
    }

    /// Referenced error codes, ascending, after everything else
    fn build_error_constants(
        &mut self,
        contract: &IrContract,
        used: &BTreeSet<String>,
        module: &mut MoveModule,
    ) {
        let mut entries: Vec<_> = contract
            .error_codes
            .iter()
            .filter(|e| used.contains(&e.name))
            .collect();
        entries.sort_by_key(|e| e.value);
        for entry in entries {
            module.constants.push(ConstantDef {
                name: entry.name.clone(),
                ty: MoveType::U64,
                value: entry.value.to_string(),
                doc: entry
                    .message
                    .as_ref()
                    .map(|message| format!("Abort when: {}", message)),
            });
        }
    }
}
