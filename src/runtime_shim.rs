//! Runtime helper module
//!
//! Some Source operations have no direct Target counterpart at full width;
//! the transformer lowers them to calls into a small helper module shipped
//! alongside the output. The core only decides *when* to reference the
//! helper — this module holds its name, its address identifier, the
//! embedded source text, and the reference detector the coordinator uses to
//! include it exactly when needed.

use crate::move_ast::{walk, MoveExprKind, MoveModule};

/// Reserved helper module name; user contracts may not lower to it
pub const SHIM_MODULE_NAME: &str = "sol_runtime";

/// Named address the helper module is published under
pub const SHIM_ADDRESS_NAME: &str = "sol_runtime";

/// Default literal address for the helper in generated manifests
pub const SHIM_DEFAULT_ADDRESS: &str = "0x51";

/// The helper module source, emitted verbatim when referenced
pub fn module_source() -> &'static str {
    r#"module sol_runtime::sol_runtime {
    /// Exponentiation for u256 values; aborts on overflow like every
    /// other arithmetic operation.
    public fun pow_u256(base: u256, exp: u256): u256 {
        let result = 1u256;
        let b = base;
        let e = exp;
        while (e > 0) {
            if (e % 2 == 1) {
                result = result * b;
            };
            e = e / 2;
            if (e > 0) {
                b = b * b;
            };
        };
        result
    }

    public fun min_u256(a: u256, b: u256): u256 {
        if (a < b) a else b
    }

    public fun max_u256(a: u256, b: u256): u256 {
        if (a > b) a else b
    }

    /// Babylonian square root, matching the rounding of the common
    /// Source library implementations.
    public fun sqrt_u256(y: u256): u256 {
        if (y < 4) {
            if (y == 0) 0 else 1
        } else {
            let z = y;
            let x = y / 2 + 1;
            while (x < z) {
                z = x;
                x = (y / x + x) / 2;
            };
            z
        }
    }
}
"#
}

/// True when the module calls into the helper
pub fn references_shim(module: &MoveModule) -> bool {
    let mut found = false;
    walk::visit_module_exprs(module, &mut |expr| {
        if let MoveExprKind::Call {
            module: Some(callee_module),
            ..
        } = &expr.kind
        {
            if callee_module == SHIM_MODULE_NAME {
                found = true;
            }
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_ast::{MoveExpr, MoveFunction, MoveStmt, MoveVisibility};

    fn module_with_call(callee_module: Option<&str>) -> MoveModule {
        let mut module = MoveModule::new("0xCAFE", "m");
        module.functions.push(MoveFunction {
            name: "f".to_string(),
            visibility: MoveVisibility::Public,
            is_entry: false,
            is_view: false,
            is_inline: false,
            acquires: Vec::new(),
            params: Vec::new(),
            returns: Vec::new(),
            body: vec![MoveStmt::Expr(MoveExpr::call(
                callee_module,
                "pow_u256",
                Vec::new(),
            ))],
        });
        module
    }

    #[test]
    fn detects_shim_calls() {
        assert!(references_shim(&module_with_call(Some(SHIM_MODULE_NAME))));
        assert!(!references_shim(&module_with_call(Some("table"))));
        assert!(!references_shim(&module_with_call(None)));
    }
}
