//! Shared data slots and their value domains.

use core::fmt;

/// One permissible value of a data slot: a non-negative bounded integer or
/// an identifier-shaped string token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Int(u32),
    Name(String),
}

impl Value {
    /// The string token, if this is a named value.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::Name(s) => Some(s.as_str()),
            Value::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<u32> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Name(_) => None,
        }
    }

    /// True if an identifier token in command text refers to this value.
    pub fn matches_token(&self, token: &str) -> bool {
        matches!(self, Value::Name(s) if s == token)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Name(s) => f.write_str(s),
        }
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Name(s.to_string())
    }
}

/// A named shared data slot.
///
/// `producers` and `consumers` mirror the data-flow arc lists kept on the
/// element side; [`crate::Model`] keeps both sides in sync.
#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    /// Permissible values, in declaration order.
    pub values: Vec<Value>,
    /// Distinguished "healthy" value; always a member of `values`.
    pub initial_value: Value,
    /// Elements writing this slot (df output from the element's view).
    pub producers: Vec<String>,
    /// Elements reading this slot (df input from the element's view).
    pub consumers: Vec<String>,
}

impl Data {
    pub(crate) fn new(values: Vec<Value>, initial_value: Value) -> Self {
        Self {
            values,
            initial_value,
            producers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    /// First value distinct from the initial one, used as the default
    /// "failed" state when synthesizing error propagation.
    pub fn first_non_initial_value(&self) -> &Value {
        self.values
            .iter()
            .find(|v| **v != self.initial_value)
            .unwrap_or(&self.initial_value)
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values.contains(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_display() {
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::from("ok").to_string(), "ok");
    }

    #[test]
    fn first_non_initial_skips_initial() {
        let d = Data::new(vec!["ok".into(), "error".into()], "ok".into());
        assert_eq!(d.first_non_initial_value(), &Value::from("error"));
    }

    #[test]
    fn first_non_initial_degenerate_single_value() {
        let d = Data::new(vec!["ok".into()], "ok".into());
        // nothing to fail into; falls back to the initial value
        assert_eq!(d.first_non_initial_value(), &Value::from("ok"));
    }
}
