//! End-to-end: the counter contract
//!
//! A single contract with `uint256 count` and increment/decrement/getCount
//! must become one module with the count on a state resource, an entry
//! function acquiring it, and a view for the getter.

mod common;

use common::*;
use sol2move::{transpile_unit, OptimizationLevel, TranspileOptions};

fn low_options() -> TranspileOptions {
    TranspileOptions::default().with_optimization(OptimizationLevel::Low)
}

#[test]
fn counter_emits_one_module() {
    let output = transpile_unit(&counter_unit(), &low_options());
    assert!(output.success);
    assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);
    assert_eq!(output.modules.len(), 1);
    assert_eq!(output.modules[0].name, "counter");
}

#[test]
fn count_lives_on_the_state_resource() {
    let output = transpile_unit(&counter_unit(), &low_options());
    let source = module_source(&output, "counter");
    assert!(source.contains("struct State has key {"), "{}", source);
    assert!(source.contains("count: u256,"), "{}", source);
}

#[test]
fn increment_is_an_entry_function_acquiring_state() {
    let output = transpile_unit(&counter_unit(), &low_options());
    let source = module_source(&output, "counter");
    assert!(
        source.contains("public entry fun increment() acquires State {"),
        "{}",
        source
    );
    assert!(
        source.contains("let state = borrow_global_mut<State>(@0xCAFE);"),
        "{}",
        source
    );
    assert!(source.contains("state.count = state.count + 1;"), "{}", source);
}

#[test]
fn get_count_is_a_view() {
    let output = transpile_unit(&counter_unit(), &low_options());
    let source = module_source(&output, "counter");
    assert!(source.contains("#[view]"), "{}", source);
    assert!(
        source.contains("public fun get_count(): u256 acquires State {"),
        "{}",
        source
    );
    // Reads borrow immutably.
    assert!(
        source.contains("let state = borrow_global<State>(@0xCAFE);"),
        "{}",
        source
    );
    assert!(source.contains("return state.count;"), "{}", source);
}

#[test]
fn initialize_publishes_the_state() {
    let output = transpile_unit(&counter_unit(), &low_options());
    let source = module_source(&output, "counter");
    assert!(
        source.contains("public entry fun initialize(deployer: &signer) {"),
        "{}",
        source
    );
    assert!(
        source.contains("assert!(!exists<State>(@0xCAFE), E_ALREADY_INITIALIZED);"),
        "{}",
        source
    );
    assert!(
        source.contains("move_to(deployer, State { count: 0 });"),
        "{}",
        source
    );
    assert!(source.contains("const E_ALREADY_INITIALIZED: u64 = 4;"), "{}", source);
}

#[test]
fn medium_optimization_moves_the_counter_into_aggregates() {
    // Both writes are compound-additive, so `count` is aggregatable and
    // gets its own group at medium optimization.
    let output = transpile_unit(&counter_unit(), &TranspileOptions::default());
    let source = module_source(&output, "counter");
    assert!(source.contains("struct Aggregates has key {"), "{}", source);
    assert!(
        source.contains("public entry fun increment() acquires Aggregates {"),
        "{}",
        source
    );
}

#[test]
fn transpiling_twice_is_identical() {
    let first = transpile_unit(&counter_unit(), &low_options());
    let second = transpile_unit(&counter_unit(), &low_options());
    assert_eq!(first.modules, second.modules);
    assert_eq!(first.warnings.len(), second.warnings.len());
}
