//! Resource partitioning
//!
//! Groups mutable state variables into keyed resources so functions that
//! touch disjoint groups can execute in parallel on the Target runtime. The
//! partition covers every mutable variable exactly once, and exactly one
//! group is primary — that group also receives synthesized fields such as
//! the reentrancy status.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::classification::{AccessSummary, VarCategory};
use crate::ir::IrContract;
use crate::lift::naming;
use crate::options::OptimizationLevel;

/// Group name for general state; always present and primary
pub const PRIMARY_GROUP: &str = "State";
pub const ADMIN_GROUP: &str = "AdminConfig";
pub const AGGREGATE_GROUP: &str = "Aggregates";
pub const USER_GROUP: &str = "UserState";
pub const ACCUMULATOR_GROUP: &str = "Accumulators";

/// A named struct holding a disjoint subset of state variables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceGroup {
    pub name: String,
    pub category: VarCategory,
    /// IR names of member variables, declaration order
    pub vars: Vec<String>,
    pub is_primary: bool,
    /// Stored at each user's own address instead of the module address
    pub per_user: bool,
}

/// Groups a function reads and writes, by group name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunctionProfile {
    pub reads: std::collections::BTreeSet<String>,
    pub writes: std::collections::BTreeSet<String>,
}

impl FunctionProfile {
    pub fn touched(&self) -> std::collections::BTreeSet<String> {
        self.reads.union(&self.writes).cloned().collect()
    }
}

/// The analyzer's output for one contract
#[derive(Debug, Clone, Serialize)]
pub struct ResourcePlan {
    pub groups: Vec<ResourceGroup>,
    /// IR-function-name keyed access profiles
    pub profiles: BTreeMap<String, FunctionProfile>,
    /// IR-variable-name keyed categories
    pub categories: BTreeMap<String, VarCategory>,
    /// Advisory only; nothing branches on it
    pub parallelization_score: u8,
}

impl ResourcePlan {
    pub fn group_of(&self, ir_var_name: &str) -> Option<&ResourceGroup> {
        self.groups
            .iter()
            .find(|g| g.vars.iter().any(|v| v == ir_var_name))
    }

    pub fn primary(&self) -> &ResourceGroup {
        self.groups
            .iter()
            .find(|g| g.is_primary)
            .expect("partition always contains a primary group")
    }

    pub fn group(&self, name: &str) -> Option<&ResourceGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Build the partition for one contract at the given optimization level
pub fn build(
    contract: &IrContract,
    summary: &AccessSummary,
    level: OptimizationLevel,
) -> ResourcePlan {
    // Constants become Target constants; everything else lives in a group.
    let partitionable: Vec<_> = contract
        .state_vars
        .iter()
        .filter(|v| v.mutability != crate::ast::VarMutability::Constant)
        .collect();

    let mut categories: BTreeMap<String, VarCategory> = BTreeMap::new();
    for var in &partitionable {
        categories.insert(var.name.clone(), summary.classify(contract, &var.source_name));
    }

    let mut groups: Vec<ResourceGroup> = Vec::new();
    let mut primary = ResourceGroup {
        name: PRIMARY_GROUP.to_string(),
        category: VarCategory::General,
        vars: Vec::new(),
        is_primary: true,
        per_user: false,
    };

    match level {
        OptimizationLevel::Low => {
            primary.vars = partitionable.iter().map(|v| v.name.clone()).collect();
            groups.push(primary);
        }
        OptimizationLevel::Medium | OptimizationLevel::High => {
            let mut admin = Vec::new();
            let mut aggregate = Vec::new();
            let mut user = Vec::new();
            let mut accumulator = Vec::new();
            for var in &partitionable {
                match categories[&var.name] {
                    VarCategory::AdminConfig => admin.push(var.name.clone()),
                    VarCategory::Aggregatable => aggregate.push(var.name.clone()),
                    VarCategory::UserKeyedMapping => user.push(var.name.clone()),
                    VarCategory::EventTrackable => accumulator.push(var.name.clone()),
                    VarCategory::General => primary.vars.push(var.name.clone()),
                }
            }

            if level == OptimizationLevel::High {
                // Mappings written exclusively under the sender's key move
                // into per-user resources stored at the user's address.
                let mut remaining_user = Vec::new();
                for ir_name in user {
                    let source_name = contract
                        .state_vars
                        .iter()
                        .find(|v| v.name == ir_name)
                        .map(|v| v.source_name.clone())
                        .unwrap_or_else(|| ir_name.clone());
                    if summary.all_writes_sender_keyed(&source_name) {
                        groups.push(ResourceGroup {
                            name: format!("User{}", naming::to_pascal_case(&ir_name)),
                            category: VarCategory::UserKeyedMapping,
                            vars: vec![ir_name],
                            is_primary: false,
                            per_user: true,
                        });
                    } else {
                        remaining_user.push(ir_name);
                    }
                }
                user = remaining_user;
            }

            groups.insert(0, primary);
            for (name, category, vars) in [
                (ADMIN_GROUP, VarCategory::AdminConfig, admin),
                (AGGREGATE_GROUP, VarCategory::Aggregatable, aggregate),
                (USER_GROUP, VarCategory::UserKeyedMapping, user),
                (ACCUMULATOR_GROUP, VarCategory::EventTrackable, accumulator),
            ] {
                if !vars.is_empty() {
                    groups.push(ResourceGroup {
                        name: name.to_string(),
                        category,
                        vars,
                        is_primary: false,
                        per_user: false,
                    });
                }
            }
        }
    }

    let profiles = build_profiles(contract, summary, &groups);
    let parallelization_score = score(&groups, &profiles);

    ResourcePlan {
        groups,
        profiles,
        categories,
        parallelization_score,
    }
}

fn build_profiles(
    contract: &IrContract,
    summary: &AccessSummary,
    groups: &[ResourceGroup],
) -> BTreeMap<String, FunctionProfile> {
    // Source name → group name.
    let mut group_of: BTreeMap<&str, &str> = BTreeMap::new();
    for group in groups {
        for ir_name in &group.vars {
            if let Some(var) = contract.state_vars.iter().find(|v| &v.name == ir_name) {
                group_of.insert(var.source_name.as_str(), group.name.as_str());
            }
        }
    }

    let mut profiles: BTreeMap<String, FunctionProfile> = BTreeMap::new();
    for function in &contract.functions {
        let mut profile = FunctionProfile::default();
        if let Some(reads) = summary.fn_reads.get(&function.name) {
            for var in reads {
                if let Some(group) = group_of.get(var.as_str()) {
                    profile.reads.insert(group.to_string());
                }
            }
        }
        if let Some(writes) = summary.fn_writes.get(&function.name) {
            for var in writes {
                if let Some(group) = group_of.get(var.as_str()) {
                    profile.writes.insert(group.to_string());
                }
            }
        }
        // The admin guard reads the ownership variable through its
        // modifier body.
        let admin_guarded = function
            .modifiers
            .iter()
            .any(|m| summary.admin_modifiers.contains(&m.name));
        if admin_guarded && groups.iter().any(|g| g.name == ADMIN_GROUP) {
            profile.reads.insert(ADMIN_GROUP.to_string());
        }
        profiles.insert(function.name.clone(), profile);
    }
    profiles
}

/// Advisory parallelization score in `[0, 100]`: monotone in the group
/// count and in the fraction of function pairs with disjoint profiles
fn score(groups: &[ResourceGroup], profiles: &BTreeMap<String, FunctionProfile>) -> u8 {
    let group_count = groups.iter().filter(|g| !g.vars.is_empty()).count() as u32;
    let touched: Vec<_> = profiles
        .values()
        .map(FunctionProfile::touched)
        .filter(|t| !t.is_empty())
        .collect();

    let mut pairs = 0u32;
    let mut disjoint = 0u32;
    for i in 0..touched.len() {
        for j in i + 1..touched.len() {
            pairs += 1;
            if touched[i].is_disjoint(&touched[j]) {
                disjoint += 1;
            }
        }
    }

    let spread = 20 * group_count.saturating_sub(1);
    let isolation = if pairs == 0 { 0 } else { 80 * disjoint / pairs };
    (spread + isolation).min(100) as u8
}
