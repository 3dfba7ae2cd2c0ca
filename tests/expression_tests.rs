//! Expression lowering: harmonization, casts, bitwise-not, bool casts
//!
//! The emitted text must never contain `~` or a cast to bool, and every
//! binary arithmetic node must end up with equal operand types.

mod common;

use common::*;
use rstest::rstest;
use sol2move::analysis::StateAccessAnalyzer;
use sol2move::ast::source::{BinaryOp, FnMutability, SourceUnit, UnaryOp, Visibility};
use sol2move::ir::IrContract;
use sol2move::move_ast::{MoveExprKind, MoveType};
use sol2move::transform::expression::ExpressionTransformer;
use sol2move::transform::{FunctionCtx, ModuleCtx};
use sol2move::{transpile_unit, OptimizationLevel, TranspileOptions};

fn pure_fn_unit(name: &str, f: sol2move::ast::source::FunctionDef) -> SourceUnit {
    unit(vec![contract(name, Vec::new(), vec![f])])
}

#[test]
fn narrower_operand_is_widened() {
    let sum = function(
        "sum",
        Visibility::Public,
        FnMutability::Pure,
        vec![param("a", "uint128"), param("b", "uint64")],
        vec![param("", "uint128")],
        vec![ret(vec![bin(BinaryOp::Add, ident("a"), ident("b"))])],
    );
    let output = transpile_unit(&pure_fn_unit("Math", sum), &TranspileOptions::default());
    let source = module_source(&output, "math");
    assert!(source.contains("return a + (b as u128);"), "{}", source);
}

#[test]
fn untyped_literal_adopts_the_other_width() {
    let double = function(
        "double",
        Visibility::Public,
        FnMutability::Pure,
        vec![param("x", "uint32")],
        vec![param("", "uint32")],
        vec![ret(vec![bin(BinaryOp::Mul, ident("x"), num("2"))])],
    );
    let output = transpile_unit(&pure_fn_unit("Math", double), &TranspileOptions::default());
    let source = module_source(&output, "math");
    // No cast appears on the literal; annotation is enough.
    assert!(source.contains("return x * 2;"), "{}", source);
}

#[rstest]
#[case("uint8", "0xff")]
#[case("uint16", "0xffff")]
#[case("uint32", "0xffffffff")]
#[case("uint64", "0xffffffffffffffff")]
#[case("uint128", "0xffffffffffffffffffffffffffffffff")]
#[case(
    "uint256",
    "0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
)]
fn bitwise_not_lowers_to_xor_with_the_width_mask(#[case] width: &str, #[case] mask: &str) {
    let flip = function(
        "flip",
        Visibility::Public,
        FnMutability::Pure,
        vec![param("x", width)],
        vec![param("", width)],
        vec![ret(vec![unary(UnaryOp::BitNot, ident("x"))])],
    );
    let output = transpile_unit(&pure_fn_unit("Math", flip), &TranspileOptions::default());
    let source = module_source(&output, "math");
    assert!(
        source.contains(&format!("return x ^ {};", mask)),
        "{}",
        source
    );
    assert!(!source.contains('~'), "{}", source);
}

#[test]
fn integer_to_bool_cast_compares_against_zero() {
    let to_bool = function(
        "toBool",
        Visibility::Public,
        FnMutability::Pure,
        vec![param("v", "uint256")],
        vec![param("", "bool")],
        vec![ret(vec![cast("bool", ident("v"))])],
    );
    let output = transpile_unit(&pure_fn_unit("Math", to_bool), &TranspileOptions::default());
    let source = module_source(&output, "math");
    assert!(source.contains("return v != 0;"), "{}", source);
    assert!(!source.contains("as bool"), "{}", source);
}

#[test]
fn identical_casts_collapse_to_one() {
    let narrow = function(
        "narrow",
        Visibility::Public,
        FnMutability::Pure,
        vec![param("x", "uint256")],
        vec![param("", "uint64")],
        vec![ret(vec![cast("uint64", cast("uint64", ident("x")))])],
    );
    let output = transpile_unit(&pure_fn_unit("Math", narrow), &TranspileOptions::default());
    let source = module_source(&output, "math");
    assert!(source.contains("return (x as u64);"), "{}", source);
    assert_eq!(source.matches("as u64").count(), 1, "{}", source);
}

#[test]
fn truncating_cast_chains_are_preserved() {
    // Widening back after a narrowing cast must keep both casts; the
    // intermediate truncation is semantic.
    let truncate = function(
        "truncate",
        Visibility::Public,
        FnMutability::Pure,
        vec![param("x", "uint256")],
        vec![param("", "uint256")],
        vec![ret(vec![cast("uint256", cast("uint64", ident("x")))])],
    );
    let output = transpile_unit(&pure_fn_unit("Math", truncate), &TranspileOptions::default());
    let source = module_source(&output, "math");
    assert!(source.contains("return ((x as u64) as u256);"), "{}", source);
}

#[test]
fn shift_amounts_become_u8() {
    let shl = function(
        "shl",
        Visibility::Public,
        FnMutability::Pure,
        vec![param("x", "uint256"), param("n", "uint256")],
        vec![param("", "uint256")],
        vec![ret(vec![bin(BinaryOp::Shl, ident("x"), ident("n"))])],
    );
    let output = transpile_unit(&pure_fn_unit("Math", shl), &TranspileOptions::default());
    let source = module_source(&output, "math");
    assert!(source.contains("return x << (n as u8);"), "{}", source);
}

#[test]
fn binary_operands_end_up_with_equal_inferred_types() {
    let contract = IrContract::new("Math", "math", sol2move::ast::source::ContractKind::Contract);
    let plan = StateAccessAnalyzer::new(OptimizationLevel::Medium).analyze(&contract);
    let options = TranspileOptions::default();
    let module_ctx = ModuleCtx::new(&contract, &plan, &options);
    let mut fctx = FunctionCtx::new(&module_ctx, true);
    fctx.locals.insert("a".to_string(), MoveType::U128);
    fctx.locals.insert("b".to_string(), MoveType::U64);

    let mut transformer = ExpressionTransformer::new(&mut fctx);
    let result = transformer.transform(&bin(BinaryOp::Add, ident("a"), ident("b")));

    match &result.expr.kind {
        MoveExprKind::Binary { lhs, rhs, .. } => {
            assert_eq!(lhs.inferred, Some(MoveType::U128));
            assert_eq!(rhs.inferred, Some(MoveType::U128));
        }
        other => panic!("Expected binary expression, got {:?}", other),
    }
    assert_eq!(result.expr.inferred, Some(MoveType::U128));
}
