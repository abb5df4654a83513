//! Processing elements.

use crate::model::Model;

/// A named processing node.
///
/// An element with a `sub_model` is a compound element: its error
/// propagation is defined by a whole nested model instead of command text.
/// An element with `repetitions > 1` executes that many times in sequence
/// before its outputs are observed. Both forms are collapsed into plain
/// leaf elements by hierarchical reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Execution time; positive and finite.
    pub time: f64,
    /// Sequential executions per observation; >= 1.
    pub repetitions: u32,
    /// Exclusively owned nested model, if this element is compound.
    pub sub_model: Option<Box<Model>>,
    /// Elements with a control-flow arc into this one.
    pub cf_inputs: Vec<String>,
    /// Elements this one passes control to.
    pub cf_outputs: Vec<String>,
    /// Data slots this element reads.
    pub df_inputs: Vec<String>,
    /// Data slots this element writes.
    pub df_outputs: Vec<String>,
    /// Raw control-flow command text, one guarded command per entry.
    pub cf_commands: Vec<String>,
    /// Raw error-propagation command text, one guarded command per entry.
    pub ep_commands: Vec<String>,
}

impl Element {
    pub(crate) fn new(time: f64, repetitions: u32) -> Self {
        Self {
            time,
            repetitions,
            sub_model: None,
            cf_inputs: Vec::new(),
            cf_outputs: Vec::new(),
            df_inputs: Vec::new(),
            df_outputs: Vec::new(),
            cf_commands: Vec::new(),
            ep_commands: Vec::new(),
        }
    }

    /// True if this element needs hierarchical reduction before flat emission.
    pub fn needs_reduction(&self) -> bool {
        self.sub_model.is_some() || self.repetitions > 1
    }

    /// True if control flow terminates here.
    pub fn is_final(&self) -> bool {
        self.cf_outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_element_is_leaf() {
        let e = Element::new(1.0, 1);
        assert!(!e.needs_reduction());
        assert!(e.is_final());
    }

    #[test]
    fn repetitions_trigger_reduction() {
        let mut e = Element::new(1.0, 1);
        e.repetitions = 3;
        assert!(e.needs_reduction());
    }
}
