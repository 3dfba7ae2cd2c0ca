//! Pipeline orchestration
//!
//! The single place that orders the phases — lift, analyze, transform,
//! extract specs, print — and owns the per-invocation state: diagnostics,
//! emitted modules, the manifest decision, and the runtime-shim inclusion.
//!
//! Error policy: errors are collected, never thrown across phase
//! boundaries. Per-contract failures degrade gracefully (the contract is
//! skipped with a diagnostic, every other contract still emits). The only
//! condition that aborts the whole invocation is a parse failure of the
//! primary Source unit, and even that returns a result payload rather than
//! an `Err`.
//!
//! Cancellation is caller-visible between major phases: a cancelled
//! invocation stops before the next phase and returns what it has.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;

use crate::analysis::StateAccessAnalyzer;
use crate::ast::source::SourceUnit;
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticKind, Severity};
use crate::external::{CompileRequest, ExternalTools};
use crate::lift::ContractLifter;
use crate::manifest;
use crate::move_ast::MoveModule;
use crate::options::TranspileOptions;
use crate::printer::{MovePrinter, PrinterOptions};
use crate::runtime_shim;
use crate::specgen::SpecExtractor;
use crate::transform::{standards, ContractTransformer};

/// One emitted Target module: its name and its final source text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmittedModule {
    pub name: String,
    pub source: String,
}

/// Everything a transpile invocation returns
#[derive(Debug, Clone, Serialize)]
pub struct TranspileOutput {
    /// False only when no modules could be produced
    pub success: bool,
    pub modules: Vec<EmittedModule>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub manifest: Option<String>,
}

impl TranspileOutput {
    /// Persist the result: one `<out>/sources/<module>.move` per emitted
    /// module, plus `<out>/Move.toml` when a manifest was generated
    pub fn write_to_dir(&self, out_dir: &std::path::Path) -> std::io::Result<()> {
        let sources = out_dir.join("sources");
        std::fs::create_dir_all(&sources)?;
        for module in &self.modules {
            std::fs::write(sources.join(format!("{}.move", module.name)), &module.source)?;
        }
        if let Some(manifest) = &self.manifest {
            std::fs::write(out_dir.join("Move.toml"), manifest)?;
        }
        Ok(())
    }

    fn from_parts(modules: Vec<EmittedModule>, bag: DiagnosticBag, manifest: Option<String>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) = bag
            .into_inner()
            .into_iter()
            .partition(|d| d.severity == Severity::Error);
        TranspileOutput {
            success: !modules.is_empty(),
            modules,
            errors,
            warnings,
            manifest,
        }
    }

    fn failure(bag: DiagnosticBag) -> Self {
        TranspileOutput::from_parts(Vec::new(), bag, None)
    }
}

/// Transpile a Source unit delivered as tagged JSON from the external
/// parser
pub fn transpile(source_json: &str, options: &TranspileOptions) -> TranspileOutput {
    Transpiler::new(options.clone()).transpile(source_json)
}

/// Transpile an already-constructed Source unit
pub fn transpile_unit(unit: &SourceUnit, options: &TranspileOptions) -> TranspileOutput {
    Transpiler::new(options.clone()).transpile_unit(unit)
}

/// The coordinator. Owns the options, the optional external tools and a
/// cancellation flag; holds no state across invocations, so independent
/// transpiles may run in parallel on separate instances.
pub struct Transpiler {
    options: TranspileOptions,
    tools: ExternalTools,
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl Transpiler {
    pub fn new(options: TranspileOptions) -> Self {
        Transpiler {
            options,
            tools: ExternalTools::none(),
            cancel_flag: None,
        }
    }

    pub fn with_tools(mut self, tools: ExternalTools) -> Self {
        self.tools = tools;
        self
    }

    /// Observe a caller-owned cancellation flag between major phases
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Entry point for textual input (tagged JSON from the external
    /// parser)
    pub fn transpile(&self, source_json: &str) -> TranspileOutput {
        let unit: SourceUnit = match serde_json::from_str(source_json) {
            Ok(unit) => unit,
            Err(err) => {
                let mut bag = DiagnosticBag::new();
                bag.push(Diagnostic::error(
                    DiagnosticKind::ParseError,
                    format!("Source AST does not parse: {}", err),
                ));
                return TranspileOutput::failure(bag);
            }
        };
        self.transpile_unit(&unit)
    }

    /// Entry point for programmatic input
    pub fn transpile_unit(&self, unit: &SourceUnit) -> TranspileOutput {
        let mut bag = DiagnosticBag::new();

        // Context sources resolve names only; a broken one is a warning,
        // not a failure.
        let mut context_units = Vec::new();
        for (i, source) in self.options.context_sources.iter().enumerate() {
            match serde_json::from_str::<SourceUnit>(source) {
                Ok(ctx) => context_units.push(ctx),
                Err(err) => bag.push(Diagnostic::warning(
                    DiagnosticKind::ParseError,
                    format!("context source {} does not parse and is ignored: {}", i, err),
                )),
            }
        }

        // Phase: lift.
        let mut lifter = ContractLifter::new();
        let contracts = lifter.lift(unit, &context_units);
        bag.extend(lifter.take_diagnostics());
        debug!("lift produced {} contract(s)", contracts.len());
        if self.cancelled() {
            return TranspileOutput::from_parts(Vec::new(), bag, None);
        }

        // Phases per contract: analyze, transform, extract, print.
        let mut module_asts: Vec<MoveModule> = Vec::new();
        for contract in &contracts {
            if self.cancelled() {
                break;
            }

            if self.options.target_as_fungible_asset && standards::is_fungible_shaped(contract) {
                bag.push(Diagnostic::warning(
                    DiagnosticKind::TemplateApplied,
                    format!(
                        "`{}` matches the fungible-asset shape; lowered to the standard template",
                        contract.source_name
                    ),
                ));
                module_asts.push(standards::fungible_module(contract, &self.options));
                continue;
            }
            if self.options.target_as_digital_asset && standards::is_digital_shaped(contract) {
                bag.push(Diagnostic::warning(
                    DiagnosticKind::TemplateApplied,
                    format!(
                        "`{}` matches the digital-asset shape; lowered to the standard template",
                        contract.source_name
                    ),
                ));
                module_asts.push(standards::digital_module(contract, &self.options));
                continue;
            }

            let analyzer = StateAccessAnalyzer::new(self.options.optimization_level);
            let plan = analyzer.analyze(contract);

            let mut transformer = ContractTransformer::new(&self.options);
            let mut module = transformer.transform(contract, &plan);
            bag.extend(transformer.take_diagnostics());

            if self.options.generate_specs {
                SpecExtractor::new().extract(&mut module);
            }
            module_asts.push(module);
        }

        // Phase: print.
        let printer = MovePrinter::new(PrinterOptions {
            call_style: self.options.call_style,
            index_notation: self.options.index_notation,
        });
        let include_shim = module_asts.iter().any(runtime_shim::references_shim);
        let mut modules = Vec::new();
        for module_ast in &module_asts {
            let mut source = printer.print_module(module_ast);
            if self.options.format {
                if let Some(formatter) = &self.tools.formatter {
                    if let Some(formatted) =
                        formatter.format(&source, self.options.compile_timeout)
                    {
                        source = formatted;
                    }
                }
            }
            info!("emitting module `{}`", module_ast.name);
            modules.push(EmittedModule {
                name: module_ast.name.clone(),
                source,
            });
        }
        if include_shim {
            modules.push(EmittedModule {
                name: runtime_shim::SHIM_MODULE_NAME.to_string(),
                source: runtime_shim::module_source().to_string(),
            });
        }

        // Optional validation over the printed text.
        if let Some(validator) = &self.tools.validator {
            for module in &modules {
                let report = validator.validate(&module.source);
                for error in report.errors {
                    bag.push(Diagnostic::warning(
                        DiagnosticKind::CompileCheckFailure,
                        format!("validator: `{}`: {}", module.name, error),
                    ));
                }
            }
        }

        // Optional compile check.
        if self.options.compile_check {
            if let Some(compiler) = &self.tools.compiler {
                let pairs: Vec<(String, String)> = modules
                    .iter()
                    .map(|m| (m.name.clone(), m.source.clone()))
                    .collect();
                let timeout = if pairs.len() > 8 {
                    self.options.large_compile_timeout
                } else {
                    self.options.compile_timeout
                };
                let package_name = self.package_name(unit);
                let report = compiler.compile(&CompileRequest {
                    modules: &pairs,
                    address: &self.options.module_address,
                    package_name: &package_name,
                    timeout,
                });
                if !report.success {
                    for issue in report.issues {
                        let diagnostic = Diagnostic::error(
                            DiagnosticKind::CompileCheckFailure,
                            format!(
                                "{}:{}:{}: {}",
                                issue.source, issue.line, issue.column, issue.message
                            ),
                        );
                        match issue.severity {
                            crate::external::IssueSeverity::Error => bag.push(diagnostic),
                            crate::external::IssueSeverity::Warning => bag.push(
                                Diagnostic::warning(
                                    DiagnosticKind::CompileCheckFailure,
                                    diagnostic.message,
                                ),
                            ),
                        }
                    }
                }
            }
        }

        // Manifest, only when something was emitted.
        let manifest_text = if self.options.generate_manifest && !modules.is_empty() {
            Some(manifest::generate(
                &self.package_name(unit),
                &self.options.module_address,
                include_shim,
            ))
        } else {
            None
        };

        TranspileOutput::from_parts(modules, bag, manifest_text)
    }

    fn package_name(&self, unit: &SourceUnit) -> String {
        self.options
            .package_name
            .clone()
            .or_else(|| {
                unit.contracts
                    .first()
                    .map(|c| crate::lift::naming::module_name(&c.name))
            })
            .unwrap_or_else(|| "transpiled".to_string())
    }
}
