//! Identifier conversion rules
//!
//! Source names arrive in PascalCase (contracts, structs, events),
//! camelCase (functions, variables) and SCREAMING_SNAKE (constants). The
//! Target convention is snake_case modules and members, PascalCase types,
//! SCREAMING_SNAKE constants. Conversions are centralized here so the
//! lifter, the transformer and the printer can never disagree about what a
//! Source name became.

/// Words that cannot be used as identifiers in the Target language
const TARGET_KEYWORDS: &[&str] = &[
    "abort", "acquires", "as", "break", "const", "continue", "copy", "else", "entry", "enum",
    "false", "for", "friend", "fun", "has", "if", "invariant", "let", "loop", "module", "move",
    "native", "public", "return", "script", "spec", "struct", "true", "use", "while",
];

/// `$` is not a valid Target identifier character
const DOLLAR_REPLACEMENT: &str = "_storage_ref";

/// True for names that are already SCREAMING_SNAKE constants
pub fn is_screaming_snake(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// camelCase / PascalCase → snake_case
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(c);
            prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// snake_case / camelCase → PascalCase
pub fn to_pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Any text → SCREAMING_SNAKE, camelCase humps split first
pub fn to_screaming_snake(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut prev_lower_or_digit = false;
    let mut prev_underscore = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && prev_lower_or_digit {
                out.push('_');
            }
            out.push(c.to_ascii_uppercase());
            prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_lower_or_digit = false;
            prev_underscore = true;
        }
    }
    out.trim_matches('_').to_string()
}

fn sanitize(name: &str) -> String {
    if name.contains('$') {
        name.replace('$', DOLLAR_REPLACEMENT)
    } else {
        name.to_string()
    }
}

fn escape_keyword(name: String) -> String {
    if TARGET_KEYWORDS.contains(&name.as_str()) {
        format!("{}_", name)
    } else {
        name
    }
}

/// Module name for a Source contract
pub fn module_name(contract_name: &str) -> String {
    escape_keyword(to_snake_case(&sanitize(contract_name)))
}

/// Member name for a Source function or variable. SCREAMING_SNAKE
/// constants keep their spelling.
pub fn member_name(source_name: &str) -> String {
    let clean = sanitize(source_name);
    if is_screaming_snake(&clean) {
        return clean;
    }
    escape_keyword(to_snake_case(&clean))
}

/// Struct / event type name
pub fn type_name(source_name: &str) -> String {
    to_pascal_case(&sanitize(source_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contracts_become_snake_case_modules() {
        assert_eq!(module_name("SimpleSwap"), "simple_swap");
        assert_eq!(module_name("ERC20Token"), "erc20_token");
        assert_eq!(module_name("Vault"), "vault");
    }

    #[test]
    fn screaming_constants_are_preserved() {
        assert_eq!(member_name("MAX_SUPPLY"), "MAX_SUPPLY");
        assert_eq!(member_name("FEE_DENOMINATOR"), "FEE_DENOMINATOR");
    }

    #[test]
    fn camel_case_members_become_snake() {
        assert_eq!(member_name("totalSupply"), "total_supply");
        assert_eq!(member_name("balanceOf"), "balance_of");
        assert_eq!(member_name("owner"), "owner");
    }

    #[test]
    fn dollar_is_rewritten() {
        assert_eq!(member_name("$value"), "_storage_ref_value");
    }

    #[test]
    fn keywords_are_escaped() {
        assert_eq!(member_name("move"), "move_");
        assert_eq!(module_name("Module"), "module_");
    }

    #[test]
    fn screaming_conversion_splits_humps() {
        assert_eq!(to_screaming_snake("notOwner"), "NOT_OWNER");
        assert_eq!(to_screaming_snake("amount too small!"), "AMOUNT_TOO_SMALL");
    }
}
