//! State-access analysis
//!
//! The analyzer walks every function body of a lifted contract, classifies
//! each state variable by its write pattern (see [`classification`]) and
//! produces the [`ResourcePlan`] the transformer builds resources from (see
//! [`resource_plan`]). Analyzing the same IR twice yields the same
//! partition.

pub mod classification;
pub mod resource_plan;

pub use classification::{AccessSummary, VarCategory};
pub use resource_plan::{
    FunctionProfile, ResourceGroup, ResourcePlan, ACCUMULATOR_GROUP, ADMIN_GROUP, AGGREGATE_GROUP,
    PRIMARY_GROUP, USER_GROUP,
};

use log::debug;

use crate::ir::IrContract;
use crate::options::OptimizationLevel;

/// Classifies state variables and partitions them into resource groups
pub struct StateAccessAnalyzer {
    level: OptimizationLevel,
}

impl StateAccessAnalyzer {
    pub fn new(level: OptimizationLevel) -> Self {
        StateAccessAnalyzer { level }
    }

    /// Analyze one contract and produce its resource plan
    pub fn analyze(&self, contract: &IrContract) -> ResourcePlan {
        let summary = AccessSummary::collect(contract);
        let plan = resource_plan::build(contract, &summary, self.level);
        debug!(
            "analyzed `{}`: {} groups, score {}",
            contract.module_name,
            plan.groups.len(),
            plan.parallelization_score
        );
        plan
    }
}
