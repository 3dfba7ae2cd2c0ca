//! Write-pattern classification of state variables
//!
//! Walks every function body once and records, per state variable, the
//! multiset of assignment operators used against it, whether each write is
//! admin-guarded or constructor-only, and which keys collection writes use.
//! The category falls out of those records.
//!
//! Bodies still carry Source-side names at this point; the summary is keyed
//! by Source name and translated to IR names when the resource plan is
//! built.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::ast::source::{AssignOp, Expr, ExprKind, StmtKind, VarMutability};
use crate::ast::walk;
use crate::ir::{IrContract, IrFunction, IrModifier};

/// Exactly one category per non-constant state variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VarCategory {
    AdminConfig,
    Aggregatable,
    UserKeyedMapping,
    EventTrackable,
    General,
}

/// Names that mark a variable as ownership/admin configuration
const ADMIN_VAR_NAMES: &[&str] = &["owner", "admin", "_owner", "_admin"];

/// Name fragments that suggest fee/accumulator semantics
const ACCUMULATOR_NAME_HINTS: &[&str] = &[
    "fee", "fees", "accrued", "accumulated", "collected", "rewards", "earned",
];

/// One write against a state variable
#[derive(Debug, Clone)]
pub struct VarWrite {
    pub op: AssignOp,
    pub function: String,
    pub in_constructor: bool,
    pub admin_guarded: bool,
    /// For collection writes: some key in the index chain is the
    /// transaction sender
    pub key_is_sender: Option<bool>,
}

/// Everything the walk learned about one contract's state accesses
#[derive(Debug, Default)]
pub struct AccessSummary {
    /// Source-name keyed write records
    pub writes: HashMap<String, Vec<VarWrite>>,
    /// Source-name keyed read counts (write targets excluded)
    pub reads: HashMap<String, usize>,
    /// Per IR-function-name variable reads (Source names)
    pub fn_reads: BTreeMap<String, BTreeSet<String>>,
    /// Per IR-function-name variable writes (Source names)
    pub fn_writes: BTreeMap<String, BTreeSet<String>>,
    /// Modifiers whose body asserts the sender equals an admin variable
    pub admin_modifiers: BTreeSet<String>,
}

impl AccessSummary {
    /// Collect access records for every function of the contract
    pub fn collect(contract: &IrContract) -> AccessSummary {
        let mut summary = AccessSummary::default();

        let admin_vars: HashSet<&str> = contract
            .state_vars
            .iter()
            .filter(|v| {
                v.mutability == VarMutability::Immutable
                    || ADMIN_VAR_NAMES.contains(&v.source_name.to_lowercase().as_str())
            })
            .map(|v| v.source_name.as_str())
            .collect();

        for modifier in &contract.modifiers {
            if is_admin_modifier(modifier, &admin_vars) {
                summary.admin_modifiers.insert(modifier.name.clone());
            }
        }

        let state_names: HashSet<&str> = contract
            .state_vars
            .iter()
            .map(|v| v.source_name.as_str())
            .collect();

        for function in &contract.functions {
            summary.collect_function(function, &state_names);
        }
        summary
    }

    fn collect_function(&mut self, function: &IrFunction, state_names: &HashSet<&str>) {
        let body = match &function.body {
            Some(body) => body,
            None => return,
        };

        let admin_guarded = function
            .modifiers
            .iter()
            .any(|m| self.admin_modifiers.contains(&m.name));

        // Flow-insensitive shadowing: any local or parameter name hides the
        // state variable for the whole function.
        let mut shadowed: HashSet<String> =
            function.params.iter().map(|p| p.name.clone()).collect();
        walk::visit_stmts(body, &mut |stmt| {
            if let StmtKind::VarDecl { names, .. } = &stmt.kind {
                for name in names {
                    shadowed.insert(name.clone());
                }
            }
        });

        let mut write_targets: Vec<(String, AssignOp, Option<bool>)> = Vec::new();
        let mut ident_counts: HashMap<String, usize> = HashMap::new();

        walk::visit_block_exprs(body, &mut |expr| {
            if let ExprKind::Assign { op, target, .. } = &expr.kind {
                if let Some((root, key_is_sender)) = write_target(target) {
                    if state_names.contains(root.as_str()) && !shadowed.contains(&root) {
                        write_targets.push((root, *op, key_is_sender));
                    }
                }
            }
            if let ExprKind::Ident { name } = &expr.kind {
                if state_names.contains(name.as_str()) && !shadowed.contains(name) {
                    *ident_counts.entry(name.clone()).or_insert(0) += 1;
                }
            }
        });

        // An admin guard reads the ownership variable through the modifier.
        let fn_reads = self.fn_reads.entry(function.name.clone()).or_default();
        let fn_writes = self.fn_writes.entry(function.name.clone()).or_default();

        for (root, op, key_is_sender) in write_targets {
            fn_writes.insert(root.clone());
            // The target head itself is not a read.
            if let Some(count) = ident_counts.get_mut(&root) {
                *count = count.saturating_sub(1);
            }
            self.writes.entry(root.clone()).or_default().push(VarWrite {
                op,
                function: function.name.clone(),
                in_constructor: function.is_constructor,
                admin_guarded,
                key_is_sender,
            });
        }

        for (name, count) in ident_counts {
            if count > 0 {
                fn_reads.insert(name.clone());
                *self.reads.entry(name).or_insert(0) += count;
            }
        }
    }

    /// Compute the category for one state variable
    pub fn classify(&self, contract: &IrContract, source_name: &str) -> VarCategory {
        let var = match contract.state_var_by_source_name(source_name) {
            Some(var) => var,
            None => return VarCategory::General,
        };
        let writes = self.writes.get(source_name).map(Vec::as_slice).unwrap_or(&[]);
        let reads = self.reads.get(source_name).copied().unwrap_or(0);

        // Immutables and constructor-only / admin-guarded variables are
        // configuration.
        if var.mutability == VarMutability::Immutable
            || (!writes.is_empty()
                && writes.iter().all(|w| w.admin_guarded || w.in_constructor))
        {
            return VarCategory::AdminConfig;
        }

        if var.ty.is_address_keyed_mapping() {
            let sender_writes = writes
                .iter()
                .filter(|w| w.key_is_sender == Some(true))
                .count();
            if !writes.is_empty() && sender_writes * 2 >= writes.len() {
                return VarCategory::UserKeyedMapping;
            }
        }

        if var.ty.is_integer() && !writes.is_empty() {
            let all_additive = writes.iter().all(|w| w.op == AssignOp::AddAssign);
            let accumulator_name = {
                let lower = var.source_name.to_lowercase();
                ACCUMULATOR_NAME_HINTS.iter().any(|hint| lower.contains(hint))
            };
            if all_additive && reads == 0 && accumulator_name {
                return VarCategory::EventTrackable;
            }

            let all_compound_additive = writes
                .iter()
                .all(|w| matches!(w.op, AssignOp::AddAssign | AssignOp::SubAssign));
            if all_compound_additive {
                return VarCategory::Aggregatable;
            }
        }

        VarCategory::General
    }

    /// Writes against a variable that all key by the transaction sender
    pub fn all_writes_sender_keyed(&self, source_name: &str) -> bool {
        match self.writes.get(source_name) {
            Some(writes) if !writes.is_empty() => {
                writes.iter().all(|w| w.key_is_sender == Some(true))
            }
            _ => false,
        }
    }
}

/// Root state variable and sender-key flag of an assignment target
fn write_target(target: &Expr) -> Option<(String, Option<bool>)> {
    match &target.kind {
        ExprKind::Ident { name } => Some((name.clone(), None)),
        ExprKind::Index { base, index } => {
            let (root, inner_key) = write_target(base)?;
            let sender = index.is_msg_sender() || inner_key == Some(true);
            Some((root, Some(sender)))
        }
        ExprKind::Member { base, .. } => write_target(base),
        _ => None,
    }
}

/// A require-form comparison of the sender against an admin variable
fn is_admin_modifier(modifier: &IrModifier, admin_vars: &HashSet<&str>) -> bool {
    let mut found = false;
    walk::visit_stmts(&modifier.body, &mut |stmt| {
        if let StmtKind::Require { cond, .. } = &stmt.kind {
            if let ExprKind::Binary {
                op: crate::ast::BinaryOp::Eq,
                lhs,
                rhs,
            } = &cond.kind
            {
                let against_admin = |expr: &Expr| {
                    matches!(&expr.kind, ExprKind::Ident { name }
                        if admin_vars.contains(name.as_str()))
                };
                if (lhs.is_msg_sender() && against_admin(rhs))
                    || (rhs.is_msg_sender() && against_admin(lhs))
                {
                    found = true;
                }
            }
        }
    });
    found
}
