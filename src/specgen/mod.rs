//! Specification extraction
//!
//! A post-pass over the emitted Target AST. Nothing here changes behavior;
//! it derives formal conditions from what the transformer already wrote:
//!
//! - every global borrow implies `aborts_if !exists<G>(addr)`, and a
//!   mutable one additionally `modifies global<G>(addr)`;
//! - every `assert!(cond, code)` implies `aborts_if ¬cond with code`,
//!   negated at the operator level where possible;
//! - small-unsigned struct fields get range invariants;
//! - a module-level pragma declares the aborts-if coverage partial, since
//!   the Target runtime also aborts on overflow and out-of-bounds.

use crate::move_ast::{
    walk, AbortsIf, MoveBinOp, MoveExpr, MoveExprKind, MoveFunction, MoveModule, MoveStructDef,
    MoveType, SpecBlock, SpecTargetKind,
};
use crate::printer::{render_expr, PrinterOptions};

/// Derives spec blocks from a transformed module
pub struct SpecExtractor {
    printer_options: PrinterOptions,
}

impl Default for SpecExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecExtractor {
    pub fn new() -> Self {
        // Spec conditions always render module-qualified; the concrete
        // call-style option is about function bodies, not specs.
        SpecExtractor {
            printer_options: PrinterOptions::default(),
        }
    }

    /// Append derived spec blocks to the module
    pub fn extract(&self, module: &mut MoveModule) {
        let mut specs = Vec::new();

        for function in &module.functions {
            let spec = self.function_spec(function);
            if !spec.is_empty() {
                specs.push(spec);
            }
        }

        for struct_def in &module.structs {
            let spec = self.struct_spec(struct_def);
            if !spec.is_empty() {
                specs.push(spec);
            }
        }

        let mut module_spec = SpecBlock::new(&module.name, SpecTargetKind::Module);
        module_spec.pragmas.push("aborts_if_is_partial".to_string());
        specs.push(module_spec);

        module.specs = specs;
    }

    fn function_spec(&self, function: &MoveFunction) -> SpecBlock {
        let mut spec = SpecBlock::new(&function.name, SpecTargetKind::Function);

        // Resource acquisition: existence conditions, then modifications.
        let mut seen: Vec<(String, String, bool)> = Vec::new();
        walk::visit_function_exprs(function, &mut |expr| {
            if let MoveExprKind::BorrowGlobal { mutable, ty, addr } = &expr.kind {
                let addr_text = render_expr(addr, &self.printer_options);
                match seen.iter().position(|(t, a, _)| t == ty && *a == addr_text) {
                    Some(i) => seen[i].2 = seen[i].2 || *mutable,
                    None => seen.push((ty.clone(), addr_text, *mutable)),
                }
            }
        });
        for (ty, addr, mutable) in &seen {
            spec.aborts_if.push(AbortsIf {
                cond: format!("!exists<{}>({})", ty, addr),
                code: None,
            });
            if *mutable {
                spec.modifies.push(format!("global<{}>({})", ty, addr));
            }
        }

        // Assertions become abort conditions with their codes.
        walk::visit_function_exprs(function, &mut |expr| {
            if let MoveExprKind::Call {
                module: None,
                func,
                args,
                ..
            } = &expr.kind
            {
                if func == "assert!" && args.len() == 2 {
                    spec.aborts_if.push(AbortsIf {
                        cond: self.negate(&args[0]),
                        code: Some(render_expr(&args[1], &self.printer_options)),
                    });
                }
            }
        });

        spec
    }

    /// Operator-level negation; non-comparisons wrap in `!(…)`
    fn negate(&self, cond: &MoveExpr) -> String {
        match &cond.kind {
            MoveExprKind::Binary { op, lhs, rhs } => {
                let flipped = match op {
                    MoveBinOp::Eq => Some(MoveBinOp::Ne),
                    MoveBinOp::Ne => Some(MoveBinOp::Eq),
                    MoveBinOp::Lt => Some(MoveBinOp::Ge),
                    MoveBinOp::Ge => Some(MoveBinOp::Lt),
                    MoveBinOp::Gt => Some(MoveBinOp::Le),
                    MoveBinOp::Le => Some(MoveBinOp::Gt),
                    _ => None,
                };
                match flipped {
                    Some(flipped) => {
                        let negated = MoveExpr::binary(flipped, (**lhs).clone(), (**rhs).clone());
                        render_expr(&negated, &self.printer_options)
                    }
                    None => format!("!({})", render_expr(cond, &self.printer_options)),
                }
            }
            MoveExprKind::Not(inner) => render_expr(inner, &self.printer_options),
            _ => format!("!({})", render_expr(cond, &self.printer_options)),
        }
    }

    fn struct_spec(&self, struct_def: &MoveStructDef) -> SpecBlock {
        let mut spec = SpecBlock::new(&struct_def.name, SpecTargetKind::Struct);
        for field in &struct_def.fields {
            let bound: Option<&str> = match field.ty {
                MoveType::U8 => Some("255"),
                MoveType::U16 => Some("65535"),
                MoveType::U32 => Some("4294967295"),
                _ => None,
            };
            if let Some(bound) = bound {
                spec.invariants
                    .push(format!("{} <= {}", field.name, bound));
            }
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_ast::{AbilitySet, MoveField, MoveStmt, MoveVisibility};

    fn function_with(body: Vec<MoveStmt>, acquires: Vec<String>) -> MoveFunction {
        MoveFunction {
            name: "f".to_string(),
            visibility: MoveVisibility::Public,
            is_entry: false,
            is_view: false,
            is_inline: false,
            acquires,
            params: Vec::new(),
            returns: Vec::new(),
            body,
        }
    }

    #[test]
    fn mutable_borrow_yields_exists_and_modifies() {
        let body = vec![MoveStmt::Let {
            name: "state".to_string(),
            ty: None,
            value: Some(MoveExpr::new(MoveExprKind::BorrowGlobal {
                mutable: true,
                ty: "State".to_string(),
                addr: Box::new(MoveExpr::address_lit("0xCAFE")),
            })),
        }];
        let mut module = MoveModule::new("0xCAFE", "m");
        module
            .functions
            .push(function_with(body, vec!["State".to_string()]));
        SpecExtractor::new().extract(&mut module);

        let spec = module
            .specs
            .iter()
            .find(|s| s.target == "f")
            .expect("function spec present");
        assert_eq!(spec.aborts_if[0].cond, "!exists<State>(@0xCAFE)");
        assert_eq!(spec.modifies[0], "global<State>(@0xCAFE)");
    }

    #[test]
    fn assert_negates_at_operator_level() {
        let cond = MoveExpr::binary(
            MoveBinOp::Ge,
            MoveExpr::ident("amount"),
            MoveExpr::ident("fee"),
        );
        let body = vec![MoveStmt::Expr(MoveExpr::call(
            None,
            "assert!",
            vec![cond, MoveExpr::ident("E_INVALID_ARGUMENT")],
        ))];
        let mut module = MoveModule::new("0xCAFE", "m");
        module.functions.push(function_with(body, Vec::new()));
        SpecExtractor::new().extract(&mut module);

        let spec = module.specs.iter().find(|s| s.target == "f").unwrap();
        assert_eq!(spec.aborts_if[0].cond, "amount < fee");
        assert_eq!(spec.aborts_if[0].code.as_deref(), Some("E_INVALID_ARGUMENT"));
    }

    #[test]
    fn small_unsigned_fields_get_range_invariants() {
        let mut module = MoveModule::new("0xCAFE", "m");
        module.structs.push(MoveStructDef {
            name: "State".to_string(),
            abilities: AbilitySet::resource(),
            fields: vec![
                MoveField {
                    name: "reentrancy_status".to_string(),
                    ty: MoveType::U8,
                },
                MoveField {
                    name: "count".to_string(),
                    ty: MoveType::U64,
                },
            ],
            is_event: false,
        });
        SpecExtractor::new().extract(&mut module);

        let spec = module
            .specs
            .iter()
            .find(|s| s.kind == SpecTargetKind::Struct)
            .unwrap();
        assert_eq!(spec.invariants, vec!["reentrancy_status <= 255"]);
    }

    #[test]
    fn module_pragma_declares_partial_coverage() {
        let mut module = MoveModule::new("0xCAFE", "m");
        SpecExtractor::new().extract(&mut module);
        let spec = module
            .specs
            .iter()
            .find(|s| s.kind == SpecTargetKind::Module)
            .unwrap();
        assert_eq!(spec.pragmas, vec!["aborts_if_is_partial"]);
    }
}
