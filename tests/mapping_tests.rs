//! End-to-end: collection access lowering
//!
//! Flat mapping reads use the with-default borrow, nested mapping writes
//! pre-insert the inner table and key by the translated sender expression.

mod common;

use common::*;
use sol2move::ast::source::SourceUnit;
use sol2move::{transpile_unit, TranspileOptions};

fn positions_unit() -> SourceUnit {
    // mapping(uint256 => mapping(address => uint256)) positions;
    // function set(uint256 pid, uint256 p) { positions[pid][msg.sender] = p; }
    let set = public_fn(
        "set",
        vec![param("pid", "uint256"), param("p", "uint256")],
        vec![assign(
            index(index(ident("positions"), ident("pid")), msg_sender()),
            ident("p"),
        )],
    );
    let get = view_fn(
        "get",
        vec![param("pid", "uint256"), param("who", "address")],
        vec![param("", "uint256")],
        vec![ret(vec![index(
            index(ident("positions"), ident("pid")),
            ident("who"),
        )])],
    );
    unit(vec![contract(
        "Positions",
        vec![state_var(
            "positions",
            "mapping(uint256 => mapping(address => uint256))",
        )],
        vec![set, get],
    )])
}

#[test]
fn nested_write_pre_inserts_the_inner_table() {
    let output = transpile_unit(&positions_unit(), &TranspileOptions::default());
    let source = module_source(&output, "positions");
    let guard_pos = source
        .find("if (!table::contains(&state.positions, pid)) {")
        .unwrap_or_else(|| panic!("missing containment guard in:\n{}", source));
    let add_pos = source
        .find("table::add(&mut state.positions, pid, table::new());")
        .unwrap_or_else(|| panic!("missing inner-table insertion in:\n{}", source));
    let upsert_pos = source
        .find("table::upsert(table::borrow_mut(&mut state.positions, pid), signer::address_of(account), p);")
        .unwrap_or_else(|| panic!("missing nested upsert in:\n{}", source));
    assert!(guard_pos < add_pos && add_pos < upsert_pos);
}

#[test]
fn sender_key_is_translated_not_literal() {
    let output = transpile_unit(&positions_unit(), &TranspileOptions::default());
    let source = module_source(&output, "positions");
    assert!(!source.contains("msg.sender"), "{}", source);
    assert!(source.contains("signer::address_of(account)"), "{}", source);
}

#[test]
fn nested_table_type_is_emitted() {
    let output = transpile_unit(&positions_unit(), &TranspileOptions::default());
    let source = module_source(&output, "positions");
    assert!(
        source.contains("positions: Table<u256, Table<address, u256>>,"),
        "{}",
        source
    );
    assert!(
        source.contains("use aptos_std::table::{Self, Table};"),
        "{}",
        source
    );
}

#[test]
fn nested_view_read_asserts_existence_and_defaults() {
    let output = transpile_unit(&positions_unit(), &TranspileOptions::default());
    let source = module_source(&output, "positions");
    // A view cannot create the inner table; it insists the outer entry is
    // there and then reads with the scalar default.
    assert!(
        source.contains("assert!(table::contains(&state.positions, pid), E_NOT_INITIALIZED);"),
        "{}",
        source
    );
    assert!(
        source.contains(
            "return *table::borrow_with_default(table::borrow(&state.positions, pid), who, &0);"
        ),
        "{}",
        source
    );
}

#[test]
fn flat_mapping_read_uses_the_scalar_default() {
    // Read-only contract: the mapping stays in the general group.
    let balance_of = view_fn(
        "balanceOf",
        vec![param("who", "address")],
        vec![param("", "uint256")],
        vec![ret(vec![index(ident("balances"), ident("who"))])],
    );
    let source_unit = unit(vec![contract(
        "Ledger",
        vec![state_var("balances", "mapping(address => uint256)")],
        vec![balance_of],
    )]);
    let output = transpile_unit(&source_unit, &TranspileOptions::default());
    let source = module_source(&output, "ledger");
    assert!(
        source.contains("return *table::borrow_with_default(&state.balances, who, &0);"),
        "{}",
        source
    );
}

#[test]
fn flat_mapping_write_is_an_upsert() {
    let set = public_fn(
        "set",
        vec![param("who", "address"), param("value", "uint256")],
        vec![assign(index(ident("balances"), ident("who")), ident("value"))],
    );
    let source_unit = unit(vec![contract(
        "Ledger",
        vec![state_var("balances", "mapping(address => uint256)")],
        vec![set],
    )]);
    let output = transpile_unit(&source_unit, &TranspileOptions::default());
    let source = module_source(&output, "ledger");
    assert!(
        source.contains("table::upsert(&mut state.balances, who, value);"),
        "{}",
        source
    );
}
