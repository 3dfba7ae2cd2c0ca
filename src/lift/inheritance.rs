//! Inheritance linearization
//!
//! Source contracts declare bases most-base-first; resolution order runs
//! the other way (the rightmost base is the closest ancestor). We compute a
//! C3-style linearization once at lift time and flatten members along it, so
//! no later component ever sees a class graph.

use std::collections::HashMap;

/// The hierarchy could not be linearized
#[derive(Debug, Clone, PartialEq)]
pub enum LinearizationError {
    /// Base list references a contract that references back
    Cycle { contract: String },
    /// The C3 merge got stuck on an inconsistent base order
    Inconsistent { contract: String },
}

impl std::fmt::Display for LinearizationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinearizationError::Cycle { contract } => {
                write!(f, "inheritance cycle through `{}`", contract)
            }
            LinearizationError::Inconsistent { contract } => {
                write!(f, "cannot linearize inheritance of `{}`", contract)
            }
        }
    }
}

impl std::error::Error for LinearizationError {}

/// Compute the linearization of `contract`, leaf first.
///
/// `bases_of` maps each known contract to its declared base list in Source
/// order. Bases missing from the map are external references; they appear
/// in the result so the caller can warn, but contribute no ancestors.
pub fn linearize(
    contract: &str,
    bases_of: &HashMap<String, Vec<String>>,
) -> Result<Vec<String>, LinearizationError> {
    let mut in_progress = Vec::new();
    linearize_inner(contract, bases_of, &mut in_progress)
}

fn linearize_inner(
    contract: &str,
    bases_of: &HashMap<String, Vec<String>>,
    in_progress: &mut Vec<String>,
) -> Result<Vec<String>, LinearizationError> {
    if in_progress.iter().any(|c| c == contract) {
        return Err(LinearizationError::Cycle {
            contract: contract.to_string(),
        });
    }

    let declared = match bases_of.get(contract) {
        Some(bases) => bases.clone(),
        // External base: linearization is just itself.
        None => return Ok(vec![contract.to_string()]),
    };
    if declared.is_empty() {
        return Ok(vec![contract.to_string()]);
    }

    in_progress.push(contract.to_string());

    // Rightmost declared base is most derived: merge in reversed order.
    let mut sequences: Vec<Vec<String>> = Vec::new();
    for base in declared.iter().rev() {
        sequences.push(linearize_inner(base, bases_of, in_progress)?);
    }
    sequences.push(declared.iter().rev().cloned().collect());

    in_progress.pop();

    let mut result = vec![contract.to_string()];
    result.extend(merge(sequences, contract)?);
    Ok(result)
}

/// C3 merge: repeatedly take the first head that appears in no tail
fn merge(
    mut sequences: Vec<Vec<String>>,
    contract: &str,
) -> Result<Vec<String>, LinearizationError> {
    let mut result = Vec::new();
    loop {
        sequences.retain(|s| !s.is_empty());
        if sequences.is_empty() {
            return Ok(result);
        }

        let candidate = sequences
            .iter()
            .map(|s| s[0].clone())
            .find(|head| {
                !sequences
                    .iter()
                    .any(|s| s.iter().skip(1).any(|item| item == head))
            })
            .ok_or_else(|| LinearizationError::Inconsistent {
                contract: contract.to_string(),
            })?;

        for seq in sequences.iter_mut() {
            seq.retain(|item| *item != candidate);
        }
        result.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(name, bases)| {
                (
                    name.to_string(),
                    bases.iter().map(|b| b.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn single_contract_is_itself() {
        let h = hierarchy(&[("A", &[])]);
        assert_eq!(linearize("A", &h).unwrap(), vec!["A"]);
    }

    #[test]
    fn rightmost_base_is_closest() {
        // contract C is A, B — B must be visited before A.
        let h = hierarchy(&[("A", &[]), ("B", &[]), ("C", &["A", "B"])]);
        assert_eq!(linearize("C", &h).unwrap(), vec!["C", "B", "A"]);
    }

    #[test]
    fn diamond_resolves_once() {
        let h = hierarchy(&[
            ("Base", &[]),
            ("Left", &["Base"]),
            ("Right", &["Base"]),
            ("Leaf", &["Left", "Right"]),
        ]);
        assert_eq!(
            linearize("Leaf", &h).unwrap(),
            vec!["Leaf", "Right", "Left", "Base"]
        );
    }

    #[test]
    fn external_bases_contribute_no_ancestors() {
        let h = hierarchy(&[("C", &["Ownable"])]);
        assert_eq!(linearize("C", &h).unwrap(), vec!["C", "Ownable"]);
    }

    #[test]
    fn cycles_are_detected() {
        let h = hierarchy(&[("A", &["B"]), ("B", &["A"])]);
        match linearize("A", &h) {
            Err(LinearizationError::Cycle { .. }) => {}
            other => panic!("Expected cycle error, got {:?}", other),
        }
    }
}
