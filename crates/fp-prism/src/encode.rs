//! Integer encoding of string-typed data values.
//!
//! The solver only knows bounded integer variables, so every distinct
//! string value across all data slots gets an integer constant. Codes are
//! assigned in ascending sorted order, skipping any code already taken by
//! a literal integer value, which keeps the encoding deterministic and
//! collision-free.

use std::collections::{BTreeMap, BTreeSet};

use fp_model::{Model, Value};

/// Deterministic string-value ↔ integer-code mapping for one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueEncoding {
    codes: BTreeMap<String, u32>,
    names: BTreeMap<u32, String>,
    max_encoded: u32,
}

impl ValueEncoding {
    /// Build the encoding over every value of every data slot in `model`.
    pub fn from_model(model: &Model) -> Self {
        let mut strings = BTreeSet::new();
        let mut ints = BTreeSet::new();
        for data in model.data().values() {
            for value in &data.values {
                match value {
                    Value::Name(s) => {
                        strings.insert(s.clone());
                    }
                    Value::Int(i) => {
                        ints.insert(*i);
                    }
                }
            }
        }

        let mut codes = BTreeMap::new();
        let mut names = BTreeMap::new();
        let mut next = 0u32;
        for name in strings {
            while ints.contains(&next) {
                next += 1;
            }
            codes.insert(name.clone(), next);
            names.insert(next, name);
            next += 1;
        }

        let max_encoded = names
            .keys()
            .last()
            .copied()
            .into_iter()
            .chain(ints.iter().rev().next().copied())
            .max()
            .unwrap_or(1)
            .max(1);

        Self {
            codes,
            names,
            max_encoded,
        }
    }

    /// Integer code of a string value, if it occurs in the model.
    pub fn code_of(&self, name: &str) -> Option<u32> {
        self.codes.get(name).copied()
    }

    /// String value behind a code, if the code encodes one.
    pub fn name_of(&self, code: u32) -> Option<&str> {
        self.names.get(&code).map(String::as_str)
    }

    /// Map a solver state value back to a model value: encoded codes decode
    /// to their string value, everything else stays a literal integer.
    pub fn decode(&self, raw: i64) -> Value {
        if raw >= 0
            && let Ok(code) = u32::try_from(raw)
            && let Some(name) = self.name_of(code)
        {
            return Value::Name(name.to_string());
        }
        Value::Int(raw.max(0) as u32)
    }

    /// Upper bound of the solver variable domain `[0 .. max]` needed to
    /// hold every literal int and every assigned code. At least 1, so a
    /// degenerate single-value domain still forms a valid range.
    pub fn max_encoded(&self) -> u32 {
        self.max_encoded
    }

    /// `(code, string)` pairs in ascending code order, for const emission.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(code, name)| (*code, name.as_str()))
    }
}
