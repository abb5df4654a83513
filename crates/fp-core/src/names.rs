//! Identifier validation against the solver's name grammar.
//!
//! Every element, data slot, failure, and string-typed data value becomes a
//! symbol in the generated solver model, so all of them must satisfy the
//! solver's identifier grammar and avoid its keywords.

use thiserror::Error;

/// Reserved words of the target model-checker language.
///
/// A model entity named after any of these would shadow solver syntax.
pub const RESERVED_WORDS: &[&str] = &[
    "A", "bool", "clock", "const", "ctmc", "C", "double", "dtmc", "E",
    "endinit", "endinvariant", "endmodule", "endrewards", "endsystem",
    "false", "formula", "filter", "func", "F", "global", "G", "init",
    "invariant", "I", "int", "label", "max", "mdp", "min", "module", "X",
    "nondeterministic", "Pmax", "Pmin", "P", "probabilistic", "prob",
    "pta", "rate", "rewards", "Rmax", "Rmin", "R", "S", "stochastic",
    "system", "true", "U", "W", "stop", "pow", "mod", "log", "floor",
];

/// Built-in numeric functions that may appear inside command text without
/// resolving to a model symbol.
pub const NUMERIC_FUNCTIONS: &[&str] = &["max", "min", "log", "mod", "pow", "floor"];

/// Name validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("Empty name")]
    Empty,

    #[error("Name \"{name}\" does not match [A-Za-z_][A-Za-z0-9_]*")]
    NotIdentifier { name: String },

    #[error("Name \"{name}\" is a reserved keyword")]
    Reserved { name: String },
}

/// True if `name` matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// True if `name` collides with a reserved word of the solver language.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Validate a candidate entity name: non-empty, identifier-shaped, not reserved.
pub fn check_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if !is_identifier(name) {
        return Err(NameError::NotIdentifier {
            name: name.to_string(),
        });
    }
    if is_reserved(name) {
        return Err(NameError::Reserved {
            name: name.to_string(),
        });
    }
    Ok(())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn grammar_conforming_non_reserved_accepted(
            name in "[A-Za-z_][A-Za-z0-9_]{0,12}"
        ) {
            if !is_reserved(&name) {
                prop_assert!(check_name(&name).is_ok());
            }
        }

        #[test]
        fn leading_digit_rejected(name in "[0-9][A-Za-z0-9_]{0,12}") {
            prop_assert!(check_name(&name).is_err());
        }
    }
}
