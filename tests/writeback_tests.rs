//! End-to-end: copy-mutate-write-back
//!
//! `Pool pool = pools[pid]; pool.reserve += amt;` copies the entry by
//! value; every exit path must upsert the mutated copy back into the table
//! at the captured key.

mod common;

use common::*;
use sol2move::ast::source::{Param, SourceUnit, StructDef};
use sol2move::ast::Span;
use sol2move::{transpile_unit, TranspileOptions};

fn pool_contract(extra_fn_body: Option<Vec<sol2move::ast::source::Stmt>>) -> SourceUnit {
    let accrue = public_fn(
        "accrue",
        vec![param("pid", "uint256"), param("amt", "uint256")],
        vec![
            var_decl("pool", "Pool", Some(index(ident("pools"), ident("pid")))),
            add_assign(member(ident("pool"), "reserve"), ident("amt")),
        ],
    );
    let mut functions = vec![accrue];
    if let Some(body) = extra_fn_body {
        functions.push(public_fn(
            "accrue_guarded",
            vec![
                param("pid", "uint256"),
                param("amt", "uint256"),
                param("stop", "bool"),
            ],
            body,
        ));
    }
    let mut pools = contract(
        "PoolVault",
        vec![state_var("pools", "mapping(uint256 => Pool)")],
        functions,
    );
    pools.structs = vec![StructDef {
        name: "Pool".to_string(),
        fields: vec![Param {
            name: "reserve".to_string(),
            ty: ty("uint256"),
        }],
        span: Span::none(),
    }];
    unit(vec![pools])
}

#[test]
fn copy_is_captured_from_the_table() {
    let output = transpile_unit(&pool_contract(None), &TranspileOptions::default());
    let source = module_source(&output, "pool_vault");
    assert!(
        source.contains("let pool = *table::borrow(&state.pools, pid);"),
        "{}",
        source
    );
    // Struct entries have no scalar default; existence is asserted first.
    assert!(
        source.contains("assert!(table::contains(&state.pools, pid), E_NOT_INITIALIZED);"),
        "{}",
        source
    );
}

#[test]
fn mutation_stays_on_the_local_until_write_back() {
    let output = transpile_unit(&pool_contract(None), &TranspileOptions::default());
    let source = module_source(&output, "pool_vault");
    assert!(
        source.contains("pool.reserve = pool.reserve + amt;"),
        "{}",
        source
    );
}

#[test]
fn function_end_upserts_the_mutated_copy() {
    let output = transpile_unit(&pool_contract(None), &TranspileOptions::default());
    let source = module_source(&output, "pool_vault");
    let mutate_pos = source.find("pool.reserve = pool.reserve + amt;").unwrap();
    let writeback_pos = source
        .find("table::upsert(&mut state.pools, pid, pool);")
        .unwrap_or_else(|| panic!("missing write-back in:\n{}", source));
    assert!(writeback_pos > mutate_pos);
}

#[test]
fn write_back_needs_a_mutable_group_borrow() {
    let output = transpile_unit(&pool_contract(None), &TranspileOptions::default());
    let source = module_source(&output, "pool_vault");
    assert!(
        source.contains("let state = borrow_global_mut<State>(@0xCAFE);"),
        "{}",
        source
    );
}

#[test]
fn every_exit_path_gets_the_write_back() {
    // pool is mutated, then a conditional early return: both that return
    // and the fall-through end must upsert.
    let body = vec![
        var_decl("pool", "Pool", Some(index(ident("pools"), ident("pid")))),
        add_assign(member(ident("pool"), "reserve"), ident("amt")),
        if_stmt(ident("stop"), vec![ret(vec![])]),
        add_assign(member(ident("pool"), "reserve"), num("1")),
    ];
    let output = transpile_unit(&pool_contract(Some(body)), &TranspileOptions::default());
    let source = module_source(&output, "pool_vault");
    let guarded = source
        .split("fun accrue_guarded")
        .nth(1)
        .expect("guarded function emitted");
    assert_eq!(
        guarded
            .matches("table::upsert(&mut state.pools, pid, pool);")
            .count(),
        2,
        "{}",
        guarded
    );
}

#[test]
fn unmutated_copy_is_not_written_back() {
    let read_only = public_fn(
        "peek",
        vec![param("pid", "uint256")],
        vec![var_decl(
            "pool",
            "Pool",
            Some(index(ident("pools"), ident("pid"))),
        )],
    );
    let mut pools = contract(
        "PoolVault",
        vec![state_var("pools", "mapping(uint256 => Pool)")],
        vec![read_only],
    );
    pools.structs = vec![StructDef {
        name: "Pool".to_string(),
        fields: vec![Param {
            name: "reserve".to_string(),
            ty: ty("uint256"),
        }],
        span: Span::none(),
    }];
    let output = transpile_unit(&unit(vec![pools]), &TranspileOptions::default());
    let source = module_source(&output, "pool_vault");
    assert!(!source.contains("table::upsert"), "{}", source);
}
