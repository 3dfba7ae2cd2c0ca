//! Printer: determinism, call styles, index notation, literal handling

mod common;

use common::*;
use proptest::prelude::*;
use rstest::rstest;
use sol2move::ast::source::SourceUnit;
use sol2move::move_ast::{
    AbilitySet, MoveExpr, MoveExprKind, MoveField, MoveFunction, MoveModule, MoveStmt,
    MoveStructDef, MoveType, MoveVisibility,
};
use sol2move::printer::{normalize_literal, MovePrinter, PrinterOptions};
use sol2move::{transpile_unit, CallStyle, TranspileOptions};

fn vector_unit() -> SourceUnit {
    let add = public_fn(
        "add",
        vec![param("v", "uint256")],
        vec![expr_stmt(call(
            member(ident("values"), "push"),
            vec![ident("v")],
        ))],
    );
    let count = view_fn(
        "count",
        Vec::new(),
        vec![param("", "uint256")],
        vec![ret(vec![member(ident("values"), "length")])],
    );
    let get = view_fn(
        "get",
        vec![param("i", "uint256")],
        vec![param("", "uint256")],
        vec![ret(vec![index(ident("values"), ident("i"))])],
    );
    unit(vec![contract(
        "Store",
        vec![state_var("values", "uint256[]")],
        vec![add, count, get],
    )])
}

fn sample_module() -> MoveModule {
    let mut module = MoveModule::new("0xCAFE", "counter");
    module.structs.push(MoveStructDef {
        name: "State".to_string(),
        abilities: AbilitySet::resource(),
        fields: vec![MoveField {
            name: "count".to_string(),
            ty: MoveType::U64,
        }],
        is_event: false,
    });
    module.functions.push(MoveFunction {
        name: "increment".to_string(),
        visibility: MoveVisibility::Public,
        is_entry: true,
        is_view: false,
        is_inline: false,
        acquires: vec!["State".to_string()],
        params: Vec::new(),
        returns: Vec::new(),
        body: vec![
            MoveStmt::Let {
                name: "state".to_string(),
                ty: None,
                value: Some(MoveExpr::new(MoveExprKind::BorrowGlobal {
                    mutable: true,
                    ty: "State".to_string(),
                    addr: Box::new(MoveExpr::address_lit("0xCAFE")),
                })),
            },
            MoveStmt::Assign {
                target: MoveExpr::field(MoveExpr::ident("state"), "count"),
                value: MoveExpr::binary(
                    sol2move::move_ast::MoveBinOp::Add,
                    MoveExpr::field(MoveExpr::ident("state"), "count"),
                    MoveExpr::literal("1", MoveType::U64),
                ),
            },
        ],
    });
    module
}

#[test]
fn two_prints_are_byte_identical() {
    let module = sample_module();
    let printer = MovePrinter::default();
    assert_eq!(printer.print_module(&module), printer.print_module(&module));
}

#[test]
fn sample_module_prints_as_expected() {
    let printer = MovePrinter::default();
    insta::assert_snapshot!(printer.print_module(&sample_module()), @r###"
    module 0xCAFE::counter {
        struct State has key {
            count: u64,
        }

        public entry fun increment() acquires State {
            let state = borrow_global_mut<State>(@0xCAFE);
            state.count = state.count + 1;
        }
    }
    "###);
}

#[test]
fn receiver_style_uses_method_calls() {
    let options = TranspileOptions::default().with_call_style(CallStyle::Receiver);
    let output = transpile_unit(&vector_unit(), &options);
    let source = module_source(&output, "store");
    assert!(source.contains(".push_back(v)"), "{}", source);
    assert!(source.contains(".length()"), "{}", source);
    assert!(!source.contains("vector::push_back"), "{}", source);
    assert!(!source.contains("vector::length"), "{}", source);
}

#[test]
fn module_qualified_style_is_the_reverse() {
    let output = transpile_unit(&vector_unit(), &TranspileOptions::default());
    let source = module_source(&output, "store");
    assert!(source.contains("vector::push_back(&mut state.values, v);"), "{}", source);
    assert!(source.contains("vector::length(&state.values)"), "{}", source);
    assert!(!source.contains(".push_back("), "{}", source);
}

#[test]
fn index_notation_renders_vector_borrows_as_brackets() {
    let options = TranspileOptions {
        index_notation: true,
        ..TranspileOptions::default()
    };
    let output = transpile_unit(&vector_unit(), &options);
    let source = module_source(&output, "store");
    assert!(source.contains("state.values[(i as u64)]"), "{}", source);
    assert!(!source.contains("vector::borrow("), "{}", source);
}

#[test]
fn index_notation_renders_global_borrows_as_brackets() {
    let options = TranspileOptions {
        index_notation: true,
        ..TranspileOptions::default()
    };
    let output = transpile_unit(&vector_unit(), &options);
    let source = module_source(&output, "store");
    assert!(source.contains("let state = &mut State[@0xCAFE];"), "{}", source);
    assert!(!source.contains("borrow_global_mut"), "{}", source);
}

#[test]
fn if_statements_carry_the_trailing_terminator() {
    let printer = MovePrinter::default();
    let stmt = MoveStmt::If {
        cond: MoveExpr::ident("ready"),
        then_block: vec![MoveStmt::Break],
        else_block: None,
    };
    let mut module = MoveModule::new("0xCAFE", "m");
    module.functions.push(MoveFunction {
        name: "f".to_string(),
        visibility: MoveVisibility::Private,
        is_entry: false,
        is_view: false,
        is_inline: false,
        acquires: Vec::new(),
        params: Vec::new(),
        returns: Vec::new(),
        body: vec![MoveStmt::While {
            cond: MoveExpr::bool_lit(true),
            body: vec![stmt],
        }],
    });
    let text = printer.print_module(&module);
    assert!(text.contains("        };\n"), "{}", text);
}

#[rstest]
#[case("1e18", "1000000000000000000")]
#[case("2e3", "2000")]
#[case("1.5e3", "1500")]
#[case("007", "7")]
#[case("0", "0")]
#[case("0xff", "0xff")]
fn literal_normalization_cases(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(normalize_literal(input), expected);
}

proptest! {
    #[test]
    fn scientific_literals_expand_to_pure_digits(mantissa in 1u64..=999_999, exponent in 0u32..=30) {
        let text = format!("{}e{}", mantissa, exponent);
        let normalized = normalize_literal(&text);
        prop_assert!(normalized.chars().all(|c| c.is_ascii_digit()));
        let expected = format!("{}{}", mantissa, "0".repeat(exponent as usize));
        prop_assert_eq!(normalized, expected);
    }

    #[test]
    fn normalization_is_idempotent(mantissa in 0u64..=999_999_999) {
        let once = normalize_literal(&mantissa.to_string());
        let twice = normalize_literal(&once);
        prop_assert_eq!(once, twice);
    }
}
