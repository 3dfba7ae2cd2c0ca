//! Error-code table
//!
//! One table per IR contract, the canonical source for every `E_*` constant
//! the module emits. Standard codes occupy fixed small integers so the same
//! failure aborts with the same code in every emitted module; each distinct
//! require/revert message gets a fresh code from 256 upward in first-seen
//! order. Downstream components consult the table by reference and never
//! fork it.

use std::collections::HashMap;

use serde::Serialize;

use crate::lift::naming::to_screaming_snake;

/// Fixed codes shared by every emitted module
pub const STANDARD_CODES: &[(&str, u64)] = &[
    ("E_UNAUTHORIZED", 1),
    ("E_REENTRANCY", 2),
    ("E_PAUSED", 3),
    ("E_ALREADY_INITIALIZED", 4),
    ("E_NOT_INITIALIZED", 5),
    ("E_INSUFFICIENT_BALANCE", 6),
    ("E_INVALID_ARGUMENT", 7),
    ("E_OVERFLOW", 8),
    ("E_UNSUPPORTED", 9),
];

/// First code handed to a message-derived constant
pub const FIRST_MESSAGE_CODE: u64 = 256;

const MESSAGE_NAME_PAYLOAD_LIMIT: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorCode {
    pub name: String,
    pub value: u64,
    /// The require/revert message this code was derived from, if any
    pub message: Option<String>,
}

/// Insertion-ordered name → code table
#[derive(Debug, Clone)]
pub struct ErrorCodeTable {
    entries: Vec<ErrorCode>,
    index: HashMap<String, usize>,
    next_message_code: u64,
}

impl Default for ErrorCodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorCodeTable {
    /// A table pre-seeded with the standard codes
    pub fn new() -> Self {
        let mut table = ErrorCodeTable {
            entries: Vec::new(),
            index: HashMap::new(),
            next_message_code: FIRST_MESSAGE_CODE,
        };
        for (name, value) in STANDARD_CODES {
            table.insert(name, *value, None);
        }
        table
    }

    fn insert(&mut self, name: &str, value: u64, message: Option<String>) {
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(ErrorCode {
            name: name.to_string(),
            value,
            message,
        });
    }

    pub fn value_of(&self, name: &str) -> Option<u64> {
        self.index.get(name).map(|i| self.entries[*i].value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Resolve the code for a require/revert message, allocating on first
    /// sight. Returns the constant name.
    pub fn code_for_message(&mut self, message: &str) -> String {
        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.message.as_deref() == Some(message))
        {
            return existing.name.clone();
        }
        let name = self.fresh_name(&normalize_message(message));
        let value = self.next_message_code;
        self.next_message_code += 1;
        self.insert(&name, value, Some(message.to_string()));
        name
    }

    /// Resolve the code for a Source custom error, allocating on first
    /// sight. Custom errors share the message namespace.
    pub fn code_for_custom_error(&mut self, error_name: &str) -> String {
        let name = format!("E_{}", to_screaming_snake(error_name));
        if self.contains(&name) {
            return name;
        }
        let value = self.next_message_code;
        self.next_message_code += 1;
        self.insert(&name, value, Some(error_name.to_string()));
        name
    }

    /// Suffix the candidate until it no longer collides
    fn fresh_name(&self, candidate: &str) -> String {
        if !self.contains(candidate) {
            return candidate.to_string();
        }
        let mut n = 2;
        loop {
            let suffixed = format!("{}_{}", candidate, n);
            if !self.contains(&suffixed) {
                return suffixed;
            }
            n += 1;
        }
    }

    /// Constant name already allocated for a message, if any. The lifter
    /// allocates every message it sees, so the transformer can look codes
    /// up without mutating the table.
    pub fn name_for_message(&self, message: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|e| e.message.as_deref() == Some(message))
            .map(|e| e.name.clone())
    }

    /// All entries, standard codes first then messages in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &ErrorCode> {
        self.entries.iter()
    }
}

/// Normalize a require message into an `E_*` constant name
fn normalize_message(message: &str) -> String {
    let payload = to_screaming_snake(message);
    let mut payload: String = payload.chars().take(MESSAGE_NAME_PAYLOAD_LIMIT).collect();
    payload = payload.trim_matches('_').to_string();
    if payload.is_empty() {
        payload = "REVERT".to_string();
    }
    format!("E_{}", payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_codes_are_seeded() {
        let table = ErrorCodeTable::new();
        assert_eq!(table.value_of("E_UNAUTHORIZED"), Some(1));
        assert_eq!(table.value_of("E_REENTRANCY"), Some(2));
        assert_eq!(table.value_of("E_UNSUPPORTED"), Some(9));
    }

    #[test]
    fn messages_number_from_256_in_first_seen_order() {
        let mut table = ErrorCodeTable::new();
        let a = table.code_for_message("insufficient output amount");
        let b = table.code_for_message("expired deadline");
        assert_eq!(table.value_of(&a), Some(256));
        assert_eq!(table.value_of(&b), Some(257));
        // Same message resolves to the same code.
        let again = table.code_for_message("insufficient output amount");
        assert_eq!(again, a);
        assert_eq!(table.value_of(&again), Some(256));
    }

    #[test]
    fn message_names_are_screaming_snake() {
        let mut table = ErrorCodeTable::new();
        let name = table.code_for_message("Insufficient output amount!");
        assert_eq!(name, "E_INSUFFICIENT_OUTPUT_AMOUNT");
    }

    #[test]
    fn colliding_names_get_suffixes() {
        let mut table = ErrorCodeTable::new();
        let a = table.code_for_message("paused?");
        // Normalizes to E_PAUSED which is a standard code, so it must not
        // shadow it.
        assert_eq!(a, "E_PAUSED_2");
        assert_eq!(table.value_of(&a), Some(256));
        assert_eq!(table.value_of("E_PAUSED"), Some(3));
    }

    #[test]
    fn custom_errors_share_the_namespace() {
        let mut table = ErrorCodeTable::new();
        let a = table.code_for_message("first");
        let b = table.code_for_custom_error("NotOwner");
        assert_eq!(b, "E_NOT_OWNER");
        assert_eq!(table.value_of(&a), Some(256));
        assert_eq!(table.value_of(&b), Some(257));
    }

    #[test]
    fn messages_can_be_looked_up_without_allocation() {
        let mut table = ErrorCodeTable::new();
        let name = table.code_for_message("zero amount");
        assert_eq!(table.name_for_message("zero amount"), Some(name));
        assert_eq!(table.name_for_message("never seen"), None);
    }
}
