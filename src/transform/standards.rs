//! Token-standard template lowering
//!
//! An ERC-20-shaped contract can be lowered to the runtime's standard
//! fungible-asset framework instead of a hand-rolled balance table, and an
//! ERC-721-shaped one to the token-objects framework. Detection is purely
//! structural — the characteristic function set must be present — and both
//! lowerings are opt-in through the transpile options.
//!
//! The templates intentionally cover the canonical surface (initialize,
//! transfer, mint, burn, balance/ownership views) rather than reproducing
//! every extension the Source contract may carry; anything beyond the
//! template surface goes through the normal pipeline when the option is
//! off.

use crate::ast::source::{ExprKind, SourceType};
use crate::ir::IrContract;
use crate::move_ast::{
    AbilitySet, ConstantDef, MoveBinOp, MoveExpr, MoveExprKind, MoveField, MoveFunction,
    MoveModule, MoveStmt, MoveStructDef, MoveType, MoveVisibility,
};
use crate::options::TranspileOptions;

/// ERC-20 shape: transfer + balanceOf + a total-supply notion
pub fn is_fungible_shaped(contract: &IrContract) -> bool {
    let has_transfer = contract
        .functions
        .iter()
        .any(|f| f.source_name == "transfer" && f.params.len() == 2);
    let has_balance_of = contract
        .functions
        .iter()
        .any(|f| f.source_name == "balanceOf" && f.params.len() == 1);
    let has_total_supply = contract
        .functions
        .iter()
        .any(|f| f.source_name == "totalSupply")
        || contract
            .state_vars
            .iter()
            .any(|v| v.source_name == "totalSupply" || v.source_name == "_totalSupply");
    has_transfer && has_balance_of && has_total_supply
}

/// ERC-721 shape: ownerOf + a transferFrom variant
pub fn is_digital_shaped(contract: &IrContract) -> bool {
    let has_owner_of = contract
        .functions
        .iter()
        .any(|f| f.source_name == "ownerOf" && f.params.len() == 1);
    let has_transfer_from = contract
        .functions
        .iter()
        .any(|f| f.source_name == "transferFrom" || f.source_name == "safeTransferFrom");
    has_owner_of && has_transfer_from
}

/// String initializer of a state variable, when it has one
fn string_constant(contract: &IrContract, names: &[&str]) -> Option<String> {
    for var in &contract.state_vars {
        if names.contains(&var.source_name.as_str()) {
            if let Some(initial) = &var.initial {
                if let ExprKind::Str { value } = &initial.kind {
                    return Some(value.clone());
                }
            }
        }
    }
    None
}

/// Numeric initializer of a `decimals`-like variable
fn decimals_constant(contract: &IrContract) -> u8 {
    for var in &contract.state_vars {
        if var.source_name == "decimals" || var.source_name == "_decimals" {
            if matches!(var.ty, SourceType::Uint(_)) {
                if let Some(initial) = &var.initial {
                    if let ExprKind::Number { value } = &initial.kind {
                        if let Ok(parsed) = value.parse::<u8>() {
                            return parsed;
                        }
                    }
                }
            }
        }
    }
    8
}

fn signer_ref_type() -> MoveType {
    MoveType::Ref {
        mutable: false,
        inner: Box::new(MoveType::Signer),
    }
}

fn metadata_object_type() -> MoveType {
    MoveType::External {
        module: "object".to_string(),
        name: "Object".to_string(),
        type_args: vec![MoveType::External {
            module: "fungible_asset".to_string(),
            name: "Metadata".to_string(),
            type_args: Vec::new(),
        }],
    }
}

fn management_ref_field(name: &str, ref_name: &str) -> MoveField {
    MoveField {
        name: name.to_string(),
        ty: MoveType::External {
            module: "fungible_asset".to_string(),
            name: ref_name.to_string(),
            type_args: Vec::new(),
        },
    }
}

fn utf8(text_expr: MoveExpr) -> MoveExpr {
    MoveExpr::call(Some("string"), "utf8", vec![text_expr]).with_type(MoveType::String)
}

fn byte_string(text: &str) -> MoveExpr {
    MoveExpr::new(MoveExprKind::ByteStringLit(text.to_string()))
}

fn assert_owner(management_local: &str) -> Vec<MoveStmt> {
    vec![MoveStmt::Expr(MoveExpr::call(
        None,
        "assert!",
        vec![
            MoveExpr::binary(
                MoveBinOp::Eq,
                MoveExpr::call(
                    Some("signer"),
                    "address_of",
                    vec![MoveExpr::ident("account")],
                ),
                MoveExpr::field(MoveExpr::ident(management_local), "owner"),
            ),
            MoveExpr::ident("E_UNAUTHORIZED"),
        ],
    ))]
}

fn borrow_management(address: &str) -> MoveStmt {
    MoveStmt::Let {
        name: "management".to_string(),
        ty: None,
        value: Some(MoveExpr::new(MoveExprKind::BorrowGlobal {
            mutable: false,
            ty: "Management".to_string(),
            addr: Box::new(MoveExpr::address_lit(address)),
        })),
    }
}

/// Lower an ERC-20-shaped contract to a fungible-asset module
pub fn fungible_module(contract: &IrContract, options: &TranspileOptions) -> MoveModule {
    let address = options.module_address.as_str();
    let name = string_constant(contract, &["name", "_name"])
        .unwrap_or_else(|| contract.source_name.clone());
    let symbol = string_constant(contract, &["symbol", "_symbol"]).unwrap_or_else(|| {
        contract.source_name.chars().take(3).collect::<String>().to_uppercase()
    });
    let decimals = decimals_constant(contract);

    let mut module = MoveModule::new(address, &contract.module_name);
    module.add_use("std::option", &[]);
    module.add_use("std::signer", &[]);
    module.add_use("std::string", &[]);
    module.add_use(
        "aptos_framework::fungible_asset",
        &["Self", "Metadata", "MintRef", "BurnRef", "TransferRef"],
    );
    module.add_use("aptos_framework::object", &["Self", "Object"]);
    module.add_use("aptos_framework::primary_fungible_store", &[]);

    module.constants.push(ConstantDef {
        name: "E_UNAUTHORIZED".to_string(),
        ty: MoveType::U64,
        value: "1".to_string(),
        doc: None,
    });
    module.constants.push(ConstantDef {
        name: "ASSET_SYMBOL".to_string(),
        ty: MoveType::Vector(Box::new(MoveType::U8)),
        value: format!("b\"{}\"", symbol),
        doc: None,
    });

    module.structs.push(MoveStructDef {
        name: "Management".to_string(),
        abilities: AbilitySet::resource(),
        fields: vec![
            MoveField {
                name: "owner".to_string(),
                ty: MoveType::Address,
            },
            management_ref_field("mint_ref", "MintRef"),
            management_ref_field("burn_ref", "BurnRef"),
            management_ref_field("transfer_ref", "TransferRef"),
        ],
        is_event: false,
    });

    // initialize: create the metadata object and stash the refs.
    let mut init_body = Vec::new();
    init_body.push(MoveStmt::Let {
        name: "constructor_ref".to_string(),
        ty: None,
        value: Some(MoveExpr::call(
            Some("object"),
            "create_named_object",
            vec![
                MoveExpr::ident("deployer"),
                MoveExpr::ident("ASSET_SYMBOL"),
            ],
        )),
    });
    init_body.push(MoveStmt::Expr(MoveExpr::call(
        Some("primary_fungible_store"),
        "create_primary_store_enabled_fungible_asset",
        vec![
            MoveExpr::borrow(false, MoveExpr::ident("constructor_ref")),
            MoveExpr::call(Some("option"), "none", Vec::new()),
            utf8(byte_string(&name)),
            utf8(MoveExpr::ident("ASSET_SYMBOL")),
            MoveExpr::literal(&decimals.to_string(), MoveType::U8),
            utf8(byte_string("")),
            utf8(byte_string("")),
        ],
    )));
    for (local, generator) in [
        ("mint_ref", "generate_mint_ref"),
        ("burn_ref", "generate_burn_ref"),
        ("transfer_ref", "generate_transfer_ref"),
    ] {
        init_body.push(MoveStmt::Let {
            name: local.to_string(),
            ty: None,
            value: Some(MoveExpr::call(
                Some("fungible_asset"),
                generator,
                vec![MoveExpr::borrow(false, MoveExpr::ident("constructor_ref"))],
            )),
        });
    }
    init_body.push(MoveStmt::Expr(MoveExpr::call(
        None,
        "move_to",
        vec![
            MoveExpr::ident("deployer"),
            MoveExpr::new(MoveExprKind::Pack {
                name: "Management".to_string(),
                fields: vec![
                    (
                        "owner".to_string(),
                        MoveExpr::call(
                            Some("signer"),
                            "address_of",
                            vec![MoveExpr::ident("deployer")],
                        ),
                    ),
                    ("mint_ref".to_string(), MoveExpr::ident("mint_ref")),
                    ("burn_ref".to_string(), MoveExpr::ident("burn_ref")),
                    ("transfer_ref".to_string(), MoveExpr::ident("transfer_ref")),
                ],
            }),
        ],
    )));
    module.functions.push(MoveFunction {
        name: "initialize".to_string(),
        visibility: MoveVisibility::Public,
        is_entry: true,
        is_view: false,
        is_inline: false,
        acquires: Vec::new(),
        params: vec![("deployer".to_string(), signer_ref_type())],
        returns: Vec::new(),
        body: init_body,
    });

    // metadata view: resolve the named object back to its handle.
    module.functions.push(MoveFunction {
        name: "metadata".to_string(),
        visibility: MoveVisibility::Public,
        is_entry: false,
        is_view: true,
        is_inline: false,
        acquires: Vec::new(),
        params: Vec::new(),
        returns: vec![metadata_object_type()],
        body: vec![MoveStmt::Return(Some(MoveExpr::new(MoveExprKind::Call {
            module: Some("object".to_string()),
            func: "address_to_object".to_string(),
            type_args: vec![MoveType::External {
                module: "fungible_asset".to_string(),
                name: "Metadata".to_string(),
                type_args: Vec::new(),
            }],
            args: vec![MoveExpr::call(
                Some("object"),
                "create_object_address",
                vec![
                    MoveExpr::borrow(false, MoveExpr::address_lit(address)),
                    MoveExpr::ident("ASSET_SYMBOL"),
                ],
            )],
        })))],
    });

    module.functions.push(MoveFunction {
        name: "balance_of".to_string(),
        visibility: MoveVisibility::Public,
        is_entry: false,
        is_view: true,
        is_inline: false,
        acquires: Vec::new(),
        params: vec![("owner".to_string(), MoveType::Address)],
        returns: vec![MoveType::U64],
        body: vec![MoveStmt::Return(Some(MoveExpr::call(
            Some("primary_fungible_store"),
            "balance",
            vec![
                MoveExpr::ident("owner"),
                MoveExpr::call(None, "metadata", Vec::new()),
            ],
        )))],
    });

    module.functions.push(MoveFunction {
        name: "transfer".to_string(),
        visibility: MoveVisibility::Public,
        is_entry: true,
        is_view: false,
        is_inline: false,
        acquires: Vec::new(),
        params: vec![
            ("account".to_string(), signer_ref_type()),
            ("to".to_string(), MoveType::Address),
            ("amount".to_string(), MoveType::U64),
        ],
        returns: Vec::new(),
        body: vec![MoveStmt::Expr(MoveExpr::call(
            Some("primary_fungible_store"),
            "transfer",
            vec![
                MoveExpr::ident("account"),
                MoveExpr::call(None, "metadata", Vec::new()),
                MoveExpr::ident("to"),
                MoveExpr::ident("amount"),
            ],
        ))],
    });

    // mint/burn stay owner-gated through the management resource.
    let mut mint_body = vec![borrow_management(address)];
    mint_body.extend(assert_owner("management"));
    mint_body.push(MoveStmt::Expr(MoveExpr::call(
        Some("primary_fungible_store"),
        "mint",
        vec![
            MoveExpr::borrow(
                false,
                MoveExpr::field(MoveExpr::ident("management"), "mint_ref"),
            ),
            MoveExpr::ident("to"),
            MoveExpr::ident("amount"),
        ],
    )));
    module.functions.push(MoveFunction {
        name: "mint".to_string(),
        visibility: MoveVisibility::Public,
        is_entry: true,
        is_view: false,
        is_inline: false,
        acquires: vec!["Management".to_string()],
        params: vec![
            ("account".to_string(), signer_ref_type()),
            ("to".to_string(), MoveType::Address),
            ("amount".to_string(), MoveType::U64),
        ],
        returns: Vec::new(),
        body: mint_body,
    });

    let mut burn_body = vec![borrow_management(address)];
    burn_body.extend(assert_owner("management"));
    burn_body.push(MoveStmt::Expr(MoveExpr::call(
        Some("primary_fungible_store"),
        "burn",
        vec![
            MoveExpr::borrow(
                false,
                MoveExpr::field(MoveExpr::ident("management"), "burn_ref"),
            ),
            MoveExpr::ident("from"),
            MoveExpr::ident("amount"),
        ],
    )));
    module.functions.push(MoveFunction {
        name: "burn".to_string(),
        visibility: MoveVisibility::Public,
        is_entry: true,
        is_view: false,
        is_inline: false,
        acquires: vec!["Management".to_string()],
        params: vec![
            ("account".to_string(), signer_ref_type()),
            ("from".to_string(), MoveType::Address),
            ("amount".to_string(), MoveType::U64),
        ],
        returns: Vec::new(),
        body: burn_body,
    });

    module
}

/// Lower an ERC-721-shaped contract to a token-objects module
pub fn digital_module(contract: &IrContract, options: &TranspileOptions) -> MoveModule {
    let address = options.module_address.as_str();
    let collection_name = string_constant(contract, &["name", "_name"])
        .unwrap_or_else(|| contract.source_name.clone());

    let mut module = MoveModule::new(address, &contract.module_name);
    module.add_use("std::option", &[]);
    module.add_use("std::signer", &[]);
    module.add_use("std::string", &[]);
    module.add_use("aptos_framework::object", &["Self", "Object"]);
    module.add_use("aptos_token_objects::collection", &[]);
    module.add_use("aptos_token_objects::token", &["Self", "Token"]);

    module.constants.push(ConstantDef {
        name: "E_UNAUTHORIZED".to_string(),
        ty: MoveType::U64,
        value: "1".to_string(),
        doc: None,
    });
    module.constants.push(ConstantDef {
        name: "COLLECTION_NAME".to_string(),
        ty: MoveType::Vector(Box::new(MoveType::U8)),
        value: format!("b\"{}\"", collection_name),
        doc: None,
    });

    module.structs.push(MoveStructDef {
        name: "Management".to_string(),
        abilities: AbilitySet::resource(),
        fields: vec![MoveField {
            name: "owner".to_string(),
            ty: MoveType::Address,
        }],
        is_event: false,
    });

    module.functions.push(MoveFunction {
        name: "initialize".to_string(),
        visibility: MoveVisibility::Public,
        is_entry: true,
        is_view: false,
        is_inline: false,
        acquires: Vec::new(),
        params: vec![("deployer".to_string(), signer_ref_type())],
        returns: Vec::new(),
        body: vec![
            MoveStmt::Expr(MoveExpr::call(
                Some("collection"),
                "create_unlimited_collection",
                vec![
                    MoveExpr::ident("deployer"),
                    utf8(byte_string("")),
                    utf8(MoveExpr::ident("COLLECTION_NAME")),
                    MoveExpr::call(Some("option"), "none", Vec::new()),
                    utf8(byte_string("")),
                ],
            )),
            MoveStmt::Expr(MoveExpr::call(
                None,
                "move_to",
                vec![
                    MoveExpr::ident("deployer"),
                    MoveExpr::new(MoveExprKind::Pack {
                        name: "Management".to_string(),
                        fields: vec![(
                            "owner".to_string(),
                            MoveExpr::call(
                                Some("signer"),
                                "address_of",
                                vec![MoveExpr::ident("deployer")],
                            ),
                        )],
                    }),
                ],
            )),
        ],
    });

    let token_object_type = MoveType::External {
        module: "token".to_string(),
        name: "Object".to_string(),
        type_args: vec![MoveType::External {
            module: "token".to_string(),
            name: "Token".to_string(),
            type_args: Vec::new(),
        }],
    };

    let mut mint_body = vec![borrow_management(address)];
    mint_body.extend(assert_owner("management"));
    mint_body.push(MoveStmt::Let {
        name: "token_ref".to_string(),
        ty: None,
        value: Some(MoveExpr::call(
            Some("token"),
            "create_named_token",
            vec![
                MoveExpr::ident("account"),
                utf8(MoveExpr::ident("COLLECTION_NAME")),
                utf8(byte_string("")),
                MoveExpr::ident("token_name"),
                MoveExpr::call(Some("option"), "none", Vec::new()),
                MoveExpr::ident("token_uri"),
            ],
        )),
    });
    mint_body.push(MoveStmt::Expr(MoveExpr::call(
        Some("object"),
        "transfer",
        vec![
            MoveExpr::ident("account"),
            MoveExpr::call(
                Some("object"),
                "object_from_constructor_ref",
                vec![MoveExpr::borrow(false, MoveExpr::ident("token_ref"))],
            )
            .with_type(token_object_type.clone()),
            MoveExpr::ident("to"),
        ],
    )));
    module.functions.push(MoveFunction {
        name: "mint".to_string(),
        visibility: MoveVisibility::Public,
        is_entry: true,
        is_view: false,
        is_inline: false,
        acquires: vec!["Management".to_string()],
        params: vec![
            ("account".to_string(), signer_ref_type()),
            ("to".to_string(), MoveType::Address),
            ("token_name".to_string(), MoveType::String),
            ("token_uri".to_string(), MoveType::String),
        ],
        returns: Vec::new(),
        body: mint_body,
    });

    module.functions.push(MoveFunction {
        name: "owner_of".to_string(),
        visibility: MoveVisibility::Public,
        is_entry: false,
        is_view: true,
        is_inline: false,
        acquires: Vec::new(),
        params: vec![("token".to_string(), token_object_type.clone())],
        returns: vec![MoveType::Address],
        body: vec![MoveStmt::Return(Some(MoveExpr::call(
            Some("object"),
            "owner",
            vec![MoveExpr::ident("token")],
        )))],
    });

    module.functions.push(MoveFunction {
        name: "transfer_from".to_string(),
        visibility: MoveVisibility::Public,
        is_entry: true,
        is_view: false,
        is_inline: false,
        acquires: Vec::new(),
        params: vec![
            ("account".to_string(), signer_ref_type()),
            ("token".to_string(), token_object_type),
            ("to".to_string(), MoveType::Address),
        ],
        returns: Vec::new(),
        body: vec![MoveStmt::Expr(MoveExpr::call(
            Some("object"),
            "transfer",
            vec![
                MoveExpr::ident("account"),
                MoveExpr::ident("token"),
                MoveExpr::ident("to"),
            ],
        ))],
    });

    module
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::source::{ContractKind, Param};
    use crate::ir::IrFunction;
    use crate::ast::Span;

    fn erc20_like() -> IrContract {
        let mut contract = IrContract::new("MyToken", "my_token", ContractKind::Contract);
        for (source_name, params) in [
            ("transfer", vec!["to", "amount"]),
            ("balanceOf", vec!["owner"]),
            ("totalSupply", vec![]),
        ] {
            contract.functions.push(IrFunction {
                name: crate::lift::naming::member_name(source_name),
                source_name: source_name.to_string(),
                visibility: crate::ast::Visibility::Public,
                mutability: crate::ast::source::FnMutability::Nonpayable,
                is_constructor: false,
                modifiers: Vec::new(),
                params: params
                    .iter()
                    .map(|p| Param {
                        name: p.to_string(),
                        ty: SourceType::Uint(256),
                    })
                    .collect(),
                returns: Vec::new(),
                body: None,
                inherited_from: None,
                from_library: false,
                span: Span::none(),
            });
        }
        contract
    }

    #[test]
    fn erc20_shape_is_detected() {
        assert!(is_fungible_shaped(&erc20_like()));
        let empty = IrContract::new("Empty", "empty", ContractKind::Contract);
        assert!(!is_fungible_shaped(&empty));
    }

    #[test]
    fn fungible_template_has_the_canonical_surface() {
        let module = fungible_module(&erc20_like(), &TranspileOptions::default());
        for name in ["initialize", "transfer", "balance_of", "mint", "burn"] {
            assert!(
                module.find_function(name).is_some(),
                "missing function `{}`",
                name
            );
        }
        // Balances live in the framework's primary stores, not a table.
        assert!(module.uses.iter().all(|u| u.path != "aptos_std::table"));
    }
}
