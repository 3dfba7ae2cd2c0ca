//! Transpile options
//!
//! Everything `transpile` recognizes, with the defaults the CLI exposes.

use std::time::Duration;

/// Selects the resource partition the state-access analyzer produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationLevel {
    /// One resource group holding every mutable variable
    Low,
    /// One group per non-empty write-pattern category
    Medium,
    /// Medium plus per-user resources for sender-keyed mappings
    High,
}

impl OptimizationLevel {
    pub fn parse(text: &str) -> Option<OptimizationLevel> {
        match text {
            "low" => Some(OptimizationLevel::Low),
            "medium" => Some(OptimizationLevel::Medium),
            "high" => Some(OptimizationLevel::High),
            _ => None,
        }
    }
}

/// Concrete-syntax style for standard-library calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStyle {
    /// `table::borrow(&t, k)`
    ModuleQualified,
    /// `t.borrow(k)`
    Receiver,
}

#[derive(Debug, Clone)]
pub struct TranspileOptions {
    /// Literal address printed in module headers and the address table
    pub module_address: String,
    /// Identifier used in the manifest and for collision checks
    pub package_name: Option<String>,
    pub generate_manifest: bool,
    /// Lower ERC-20-shaped contracts to the fungible-asset template
    pub target_as_fungible_asset: bool,
    /// Lower ERC-721-shaped contracts to the digital-asset template
    pub target_as_digital_asset: bool,
    /// Additional Source units (tagged JSON) parsed only for cross-file
    /// library and constant resolution; they never emit modules
    pub context_sources: Vec<String>,
    /// Post-process output through the external formatter when wired
    pub format: bool,
    pub generate_specs: bool,
    pub optimization_level: OptimizationLevel,
    pub call_style: CallStyle,
    pub index_notation: bool,
    /// Run the external compile check when a compiler is wired
    pub compile_check: bool,
    /// Deadline per module-batch compile
    pub compile_timeout: Duration,
    /// Deadline for large compilations
    pub large_compile_timeout: Duration,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        TranspileOptions {
            module_address: "0xCAFE".to_string(),
            package_name: None,
            generate_manifest: true,
            target_as_fungible_asset: false,
            target_as_digital_asset: false,
            context_sources: Vec::new(),
            format: false,
            generate_specs: false,
            optimization_level: OptimizationLevel::Medium,
            call_style: CallStyle::ModuleQualified,
            index_notation: false,
            compile_check: false,
            compile_timeout: Duration::from_secs(60),
            large_compile_timeout: Duration::from_secs(120),
        }
    }
}

impl TranspileOptions {
    pub fn with_address(mut self, address: &str) -> Self {
        self.module_address = address.to_string();
        self
    }

    pub fn with_optimization(mut self, level: OptimizationLevel) -> Self {
        self.optimization_level = level;
        self
    }

    pub fn with_call_style(mut self, style: CallStyle) -> Self {
        self.call_style = style;
        self
    }
}
