//! End-to-end: reentrancy guard synthesis
//!
//! A `nonReentrant` function gets a status field (added exactly once, and
//! never duplicated when the Source already declares one), an assert/lock
//! prologue, and the idle restore before every exit.

mod common;

use common::*;
use sol2move::ast::source::SourceUnit;
use sol2move::{transpile_unit, TranspileOptions};

/// Vault with no pre-existing status variable
fn vault_unit() -> SourceUnit {
    let withdraw = with_modifiers(
        public_fn(
            "withdraw",
            vec![param("amount", "uint256")],
            vec![sub_assign(ident("total"), ident("amount"))],
        ),
        &["nonReentrant"],
    );
    let mut vault = contract(
        "Vault",
        vec![state_var("total", "uint256")],
        vec![withdraw],
    );
    vault.modifiers = vec![modifier("nonReentrant", vec![placeholder()])];
    unit(vec![vault])
}

/// Vault that already declares a `_status` field in the Source
fn vault_with_declared_status() -> SourceUnit {
    let mut source_unit = vault_unit();
    source_unit.contracts[0]
        .state_vars
        .push(state_var("_status", "uint8"));
    source_unit
}

#[test]
fn status_field_is_added_exactly_once() {
    let output = transpile_unit(&vault_unit(), &TranspileOptions::default());
    let source = module_source(&output, "vault");
    assert_eq!(
        source.matches("reentrancy_status: u8,").count(),
        1,
        "{}",
        source
    );
}

#[test]
fn guard_asserts_idle_then_locks() {
    let output = transpile_unit(&vault_unit(), &TranspileOptions::default());
    let source = module_source(&output, "vault");
    let assert_pos = source
        .find("assert!(state.reentrancy_status == 1, E_REENTRANCY);")
        .unwrap_or_else(|| panic!("missing guard assert in:\n{}", source));
    let lock_pos = source
        .find("state.reentrancy_status = 2;")
        .unwrap_or_else(|| panic!("missing lock in:\n{}", source));
    let body_pos = source
        .find("aggregates.total = aggregates.total - amount;")
        .unwrap_or_else(|| panic!("missing body in:\n{}", source));
    assert!(assert_pos < lock_pos && lock_pos < body_pos);
}

#[test]
fn guard_restores_idle_before_exit() {
    let output = transpile_unit(&vault_unit(), &TranspileOptions::default());
    let source = module_source(&output, "vault");
    let body_pos = source
        .find("aggregates.total = aggregates.total - amount;")
        .unwrap();
    let restore_pos = source
        .find("state.reentrancy_status = 1;")
        .unwrap_or_else(|| panic!("missing restore in:\n{}", source));
    assert!(restore_pos > body_pos);
}

#[test]
fn guard_restores_before_explicit_returns() {
    let withdraw = with_modifiers(
        public_fn(
            "withdraw",
            vec![param("amount", "uint256")],
            vec![
                sub_assign(ident("total"), ident("amount")),
                ret(vec![]),
            ],
        ),
        &["nonReentrant"],
    );
    let mut vault = contract(
        "Vault",
        vec![state_var("total", "uint256")],
        vec![withdraw],
    );
    vault.modifiers = vec![modifier("nonReentrant", vec![placeholder()])];
    let output = transpile_unit(&unit(vec![vault]), &TranspileOptions::default());
    let source = module_source(&output, "vault");

    let restore_pos = source.find("state.reentrancy_status = 1;").unwrap();
    let return_pos = source.find("return;").unwrap();
    assert!(
        restore_pos < return_pos,
        "restore must precede the return:\n{}",
        source
    );
}

#[test]
fn declared_status_variable_is_not_duplicated() {
    let output = transpile_unit(&vault_with_declared_status(), &TranspileOptions::default());
    let source = module_source(&output, "vault");
    // The declared field carries the guard; no canonical field appears.
    assert!(!source.contains("reentrancy_status"), "{}", source);
    assert_eq!(source.matches("_status: u8,").count(), 1, "{}", source);
    assert!(
        source.contains("assert!(state._status == 1, E_REENTRANCY);"),
        "{}",
        source
    );
    // The declared field still starts at the idle sentinel.
    assert!(
        source.contains("move_to(deployer, State { _status: 1 });"),
        "{}",
        source
    );
}

#[test]
fn reentrancy_code_constant_is_declared() {
    let output = transpile_unit(&vault_unit(), &TranspileOptions::default());
    let source = module_source(&output, "vault");
    assert!(source.contains("const E_REENTRANCY: u64 = 2;"), "{}", source);
}

#[test]
fn initialize_seeds_the_idle_sentinel() {
    let output = transpile_unit(&vault_unit(), &TranspileOptions::default());
    let source = module_source(&output, "vault");
    assert!(
        source.contains("move_to(deployer, State { reentrancy_status: 1 });"),
        "{}",
        source
    );
}
