//! Reentrancy guard vocabulary
//!
//! The one place that knows which Source names denote a reentrancy status
//! field and which modifier names request guarding. Both the state-struct
//! builder (field deduplication) and the function transformer (guard
//! synthesis) read this table; keeping a second copy anywhere is a bug.

/// Source names recognized as an existing reentrancy status field, camel
/// and snake variants included
pub const STATUS_FIELD_NAMES: &[&str] = &[
    "reentrancy_status",
    "reentrancyStatus",
    "_status",
    "status",
    "locked",
    "_locked",
    "reentrancy_guard",
    "reentrancyGuard",
];

/// Modifier names that request a reentrancy guard
pub const GUARD_MODIFIER_NAMES: &[&str] = &["nonReentrant", "non_reentrant", "noReentrancy"];

/// Field name used when the Source declares no status variable
pub const CANONICAL_FIELD: &str = "reentrancy_status";

/// Sentinel meaning "not inside a guarded call"
pub const STATUS_IDLE: u64 = 1;

/// Sentinel meaning "guarded call in progress"
pub const STATUS_LOCKED: u64 = 2;

/// True when the modifier name requests a reentrancy guard
pub fn is_guard_modifier(name: &str) -> bool {
    GUARD_MODIFIER_NAMES.contains(&name)
}

/// True when a declared variable name is already a status field
pub fn is_status_field_name(source_name: &str) -> bool {
    STATUS_FIELD_NAMES.contains(&source_name)
}

/// The status field name to use for a contract: the declared one when the
/// Source already has it, the canonical name otherwise. Prevents duplicate
/// field insertion.
pub fn status_field_for<'a>(declared: impl Iterator<Item = &'a str>) -> (String, bool) {
    for name in declared {
        if is_status_field_name(name) {
            return (crate::lift::naming::member_name(name), true);
        }
    }
    (CANONICAL_FIELD.to_string(), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_field_wins_over_canonical() {
        let declared = vec!["balance", "_status"];
        let (field, existed) = status_field_for(declared.iter().copied());
        assert_eq!(field, "_status");
        assert!(existed);
    }

    #[test]
    fn canonical_field_used_when_none_declared() {
        let declared = vec!["balance", "owner"];
        let (field, existed) = status_field_for(declared.iter().copied());
        assert_eq!(field, CANONICAL_FIELD);
        assert!(!existed);
    }

    #[test]
    fn camel_variants_are_recognized() {
        assert!(is_status_field_name("reentrancyStatus"));
        assert!(is_status_field_name("reentrancy_status"));
        assert!(is_guard_modifier("nonReentrant"));
    }
}
