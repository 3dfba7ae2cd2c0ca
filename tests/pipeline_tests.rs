//! Coordinator behavior: parse failure, skips, conflicts, manifest, shim,
//! error-code ordering, token-standard templates

mod common;

use common::*;
use sol2move::ast::source::{ContractKind, Expr, SourceUnit, Visibility};
use sol2move::{transpile, transpile_unit, DiagnosticKind, TranspileOptions};

#[test]
fn malformed_json_is_a_parse_error() {
    let output = transpile("{ not json", &TranspileOptions::default());
    assert!(!output.success);
    assert!(output.modules.is_empty());
    assert!(output
        .errors
        .iter()
        .any(|d| d.kind == DiagnosticKind::ParseError));
}

#[test]
fn json_input_round_trips_through_serde() {
    let json = serde_json::to_string(&counter_unit()).expect("unit serializes");
    let output = transpile(&json, &TranspileOptions::default());
    assert!(output.success, "{:?}", output.errors);
    assert_eq!(output.modules.len(), 1);
    assert_eq!(output.modules[0].name, "counter");
}

#[test]
fn interfaces_are_skipped_with_a_warning() {
    let mut iface = contract("IERC20", Vec::new(), Vec::new());
    iface.kind = ContractKind::Interface;
    let output = transpile_unit(&unit(vec![iface]), &TranspileOptions::default());

    assert!(!output.success);
    assert!(output.modules.is_empty());
    assert!(output
        .warnings
        .iter()
        .any(|d| d.kind == DiagnosticKind::InterfaceSkipped));
}

#[test]
fn module_name_conflicts_drop_the_later_contract() {
    let first = contract("Vault", vec![state_var("a", "uint256")], Vec::new());
    let second = contract("vault", vec![state_var("b", "uint256")], Vec::new());
    let output = transpile_unit(&unit(vec![first, second]), &TranspileOptions::default());

    assert!(output.success);
    assert_eq!(output.modules.len(), 1);
    assert!(output
        .errors
        .iter()
        .any(|d| d.kind == DiagnosticKind::HelperModuleNameConflict));
}

#[test]
fn reserved_helper_name_is_rejected() {
    let clash = contract("SolRuntime", vec![state_var("a", "uint256")], Vec::new());
    let output = transpile_unit(&unit(vec![clash]), &TranspileOptions::default());

    assert!(!output.success);
    assert!(output
        .errors
        .iter()
        .any(|d| d.kind == DiagnosticKind::HelperModuleNameConflict));
}

#[test]
fn manifest_is_emitted_with_the_module_address() {
    let options = TranspileOptions::default().with_address("0xBEEF");
    let output = transpile_unit(&counter_unit(), &options);
    let manifest = output.manifest.as_deref().expect("manifest generated");
    assert!(manifest.contains("counter = \"0xBEEF\""), "{}", manifest);
    assert!(!manifest.contains("sol_runtime"), "{}", manifest);
    let source = module_source(&output, "counter");
    assert!(source.starts_with("module 0xBEEF::counter {"), "{}", source);
}

#[test]
fn manifest_generation_can_be_disabled() {
    let options = TranspileOptions {
        generate_manifest: false,
        ..TranspileOptions::default()
    };
    let output = transpile_unit(&counter_unit(), &options);
    assert!(output.success);
    assert!(output.manifest.is_none());
}

fn power_unit() -> SourceUnit {
    use sol2move::ast::source::BinaryOp;
    let set = public_fn(
        "set",
        vec![param("a", "uint256"), param("b", "uint256")],
        vec![assign(ident("value"), bin(BinaryOp::Pow, ident("a"), ident("b")))],
    );
    unit(vec![contract(
        "Power",
        vec![state_var("value", "uint256")],
        vec![set],
    )])
}

#[test]
fn shim_is_shipped_exactly_when_referenced() {
    let output = transpile_unit(&power_unit(), &TranspileOptions::default());
    let power = module_source(&output, "power");
    assert!(
        power.contains("sol_runtime::pow_u256(a, b)"),
        "{}",
        power
    );
    assert!(power.contains("use sol_runtime::sol_runtime;"), "{}", power);

    let shim = module_source(&output, "sol_runtime");
    assert!(shim.contains("module sol_runtime::sol_runtime {"), "{}", shim);
    assert!(
        output.manifest.unwrap().contains("sol_runtime = \"0x51\""),
        "shim address missing from manifest"
    );

    // And not shipped when nothing references it.
    let counter = transpile_unit(&counter_unit(), &TranspileOptions::default());
    assert!(counter.modules.iter().all(|m| m.name != "sol_runtime"));
}

#[test]
fn error_codes_are_declared_ascending_with_standard_codes_first() {
    let guarded = public_fn(
        "guarded",
        vec![param("a", "uint256")],
        vec![
            require(ident("ok_a"), Some("first failure")),
            require(ident("ok_b"), Some("second failure")),
            assign(ident("value"), ident("a")),
        ],
    );
    let source_unit = unit(vec![contract(
        "Guarded",
        vec![
            state_var("value", "uint256"),
            state_var("ok_a", "bool"),
            state_var("ok_b", "bool"),
        ],
        vec![guarded],
    )]);
    let output = transpile_unit(&source_unit, &TranspileOptions::default());
    let source = module_source(&output, "guarded");

    let initialized = source
        .find("const E_ALREADY_INITIALIZED: u64 = 4;")
        .expect("standard code declared");
    let first = source
        .find("const E_FIRST_FAILURE: u64 = 256;")
        .unwrap_or_else(|| panic!("missing first message code in:\n{}", source));
    let second = source
        .find("const E_SECOND_FAILURE: u64 = 257;")
        .unwrap_or_else(|| panic!("missing second message code in:\n{}", source));
    assert!(initialized < first && first < second);
}

#[test]
fn unsupported_constructs_mark_but_do_not_abort() {
    // A dynamic external call has no Target lowering.
    let pay = public_fn(
        "forward",
        vec![param("target", "address")],
        vec![expr_stmt(call(
            member(ident("target"), "transfer"),
            vec![num("1")],
        ))],
    );
    let output = transpile_unit(
        &unit(vec![contract("Fwd", vec![state_var("value", "uint256")], vec![pay])]),
        &TranspileOptions::default(),
    );
    assert!(output.success);
    let source = module_source(&output, "fwd");
    assert!(source.contains("/* unsupported:"), "{}", source);
    assert!(output
        .warnings
        .iter()
        .any(|d| d.kind == DiagnosticKind::UnsupportedConstruct));
}

#[test]
fn erc20_shape_uses_the_fungible_asset_template_when_enabled() {
    let transfer = public_fn(
        "transfer",
        vec![param("to", "address"), param("amount", "uint256")],
        vec![],
    );
    let balance_of = view_fn(
        "balanceOf",
        vec![param("owner", "address")],
        vec![param("", "uint256")],
        vec![ret(vec![num("0")])],
    );
    let total_supply = view_fn(
        "totalSupply",
        Vec::new(),
        vec![param("", "uint256")],
        vec![ret(vec![num("0")])],
    );
    let token = contract("MyToken", Vec::new(), vec![transfer, balance_of, total_supply]);

    let options = TranspileOptions {
        target_as_fungible_asset: true,
        ..TranspileOptions::default()
    };
    let output = transpile_unit(&unit(vec![token.clone()]), &options);
    let source = module_source(&output, "my_token");
    assert!(source.contains("primary_fungible_store"), "{}", source);
    assert!(!source.contains("Table<"), "{}", source);
    assert!(output
        .warnings
        .iter()
        .any(|d| d.kind == DiagnosticKind::TemplateApplied));

    // With the option off, the same contract goes through the normal
    // pipeline.
    let plain = transpile_unit(&unit(vec![token]), &TranspileOptions::default());
    let plain_source = module_source(&plain, "my_token");
    assert!(
        !plain_source.contains("primary_fungible_store"),
        "{}",
        plain_source
    );
}

#[test]
fn generate_specs_derives_abort_conditions() {
    let options = TranspileOptions {
        generate_specs: true,
        ..TranspileOptions::default()
    };
    let output = transpile_unit(&counter_unit(), &options);
    let source = module_source(&output, "counter");

    // Resource acquisition of the aggregates group becomes existence and
    // modification conditions.
    assert!(source.contains("spec increment {"), "{}", source);
    assert!(
        source.contains("aborts_if !exists<Aggregates>(@0xCAFE);"),
        "{}",
        source
    );
    assert!(
        source.contains("modifies global<Aggregates>(@0xCAFE);"),
        "{}",
        source
    );
    // The initialize assert negates at the operator level.
    assert!(
        source.contains("aborts_if exists<State>(@0xCAFE) with E_ALREADY_INITIALIZED;"),
        "{}",
        source
    );
    // Coverage is declared partial at module level.
    assert!(source.contains("spec module {"), "{}", source);
    assert!(source.contains("pragma aborts_if_is_partial;"), "{}", source);
}

#[test]
fn context_sources_resolve_cross_file_libraries() {
    // The library lives in a separate unit passed only for resolution.
    let lib_fn = function(
        "double",
        Visibility::Internal,
        sol2move::ast::source::FnMutability::Pure,
        vec![param("a", "uint256")],
        vec![param("", "uint256")],
        vec![ret(vec![bin(
            sol2move::ast::source::BinaryOp::Mul,
            ident("a"),
            num("2"),
        )])],
    );
    let mut lib = contract("MathLib", Vec::new(), vec![lib_fn]);
    lib.kind = ContractKind::Library;
    let context_json = serde_json::to_string(&unit(vec![lib])).unwrap();

    let user = public_fn(
        "bump",
        vec![param("x", "uint256")],
        vec![assign(
            ident("value"),
            call(member(ident("MathLib"), "double"), vec![ident("x")]),
        )],
    );
    let main = unit(vec![contract(
        "Bumper",
        vec![state_var("value", "uint256")],
        vec![user],
    )]);

    let options = TranspileOptions {
        context_sources: vec![context_json],
        ..TranspileOptions::default()
    };
    let output = transpile_unit(&main, &options);
    // The context unit never emits a module, but its member is flattened
    // into the user.
    assert_eq!(output.modules.len(), 1);
    let source = module_source(&output, "bumper");
    assert!(source.contains("fun double(a: u256): u256 {"), "{}", source);
    assert!(source.contains("state.value = double(x);"), "{}", source);
}

#[test]
fn output_layout_puts_sources_and_manifest_in_place() {
    let dir = tempfile::tempdir().expect("temp dir");
    let output = transpile_unit(&counter_unit(), &TranspileOptions::default());
    output.write_to_dir(dir.path()).expect("write succeeds");

    let module_path = dir.path().join("sources").join("counter.move");
    assert!(module_path.exists());
    let text = std::fs::read_to_string(module_path).unwrap();
    assert!(text.starts_with("module 0xCAFE::counter {"));
    assert!(dir.path().join("Move.toml").exists());
}

#[test]
fn libraries_are_flattened_into_their_users() {
    use sol2move::ast::source::{BinaryOp, FnMutability};
    let lib_fn = function(
        "min",
        Visibility::Internal,
        FnMutability::Pure,
        vec![param("a", "uint256"), param("b", "uint256")],
        vec![param("", "uint256")],
        vec![ret(vec![Expr::new(sol2move::ast::source::ExprKind::Conditional {
            cond: Box::new(bin(BinaryOp::Lt, ident("a"), ident("b"))),
            then_value: Box::new(ident("a")),
            else_value: Box::new(ident("b")),
        })])],
    );
    let mut lib = contract("MathLib", Vec::new(), vec![lib_fn]);
    lib.kind = ContractKind::Library;

    let user = public_fn(
        "clamp",
        vec![param("x", "uint256")],
        vec![assign(
            ident("value"),
            call(member(ident("MathLib"), "min"), vec![ident("x"), num("100")]),
        )],
    );
    let main = contract("Clamper", vec![state_var("value", "uint256")], vec![user]);

    let output = transpile_unit(&unit(vec![lib, main]), &TranspileOptions::default());
    // The library emits no module of its own.
    assert_eq!(output.modules.len(), 1);
    let source = module_source(&output, "clamper");
    assert!(source.contains("fun min(a: u256, b: u256): u256 {"), "{}", source);
    assert!(source.contains("state.value = min(x, 100);"), "{}", source);
}
