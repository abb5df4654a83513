//! The model aggregate and its invariant-preserving operations.

use std::collections::{BTreeMap, BTreeSet};

use fp_core::check_name;
use tracing::debug;

use crate::ModelResult;
use crate::data::{Data, Value};
use crate::element::Element;
use crate::error::ModelError;

/// A reliability model: elements, shared data slots, and failure
/// expressions, sharing one flat namespace.
///
/// All three maps are `BTreeMap` so iteration order (and therefore every
/// generated constant code and command) is deterministic.
///
/// Every mutating operation validates its preconditions before touching
/// state: on `Err` the model is observably unchanged. Control-flow and
/// data-flow arcs are stored mirrored on both endpoints and only ever
/// updated through the paired operations here, so the mirrors cannot
/// desynchronize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    elements: BTreeMap<String, Element>,
    data: BTreeMap<String, Data>,
    failures: BTreeMap<String, String>,
    initial_element: Option<String>,
}

fn remove_entry(list: &mut Vec<String>, item: &str) {
    if let Some(pos) = list.iter().position(|x| x == item) {
        list.remove(pos);
    }
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // --- accessors ---

    pub fn elements(&self) -> &BTreeMap<String, Element> {
        &self.elements
    }

    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements.get(name)
    }

    pub fn data(&self) -> &BTreeMap<String, Data> {
        &self.data
    }

    pub fn data_slot(&self, name: &str) -> Option<&Data> {
        self.data.get(name)
    }

    pub fn failures(&self) -> &BTreeMap<String, String> {
        &self.failures
    }

    pub fn failure(&self, name: &str) -> Option<&str> {
        self.failures.get(name).map(String::as_str)
    }

    pub fn initial_element(&self) -> Option<&str> {
        self.initial_element.as_deref()
    }

    /// Namespace kind currently occupying `name`, if any.
    pub fn existing_kind(&self, name: &str) -> Option<&'static str> {
        if self.elements.contains_key(name) {
            Some("element")
        } else if self.data.contains_key(name) {
            Some("data")
        } else if self.failures.contains_key(name) {
            Some("failure")
        } else {
            None
        }
    }

    /// Element names in deterministic order; handy when an iteration needs
    /// to mutate the model as it goes.
    pub fn element_names(&self) -> Vec<String> {
        self.elements.keys().cloned().collect()
    }

    // --- name checks ---

    fn check_new_name(&self, name: &str) -> ModelResult<()> {
        check_name(name)?;
        if let Some(existing) = self.existing_kind(name) {
            return Err(ModelError::DuplicateName {
                name: name.to_string(),
                existing,
            });
        }
        Ok(())
    }

    fn require_element(&self, name: &str) -> ModelResult<&Element> {
        self.elements.get(name).ok_or_else(|| ModelError::NoSuchElement {
            name: name.to_string(),
        })
    }

    fn require_data(&self, name: &str) -> ModelResult<&Data> {
        self.data.get(name).ok_or_else(|| ModelError::NoSuchData {
            name: name.to_string(),
        })
    }

    // --- lifecycle ---

    pub fn clear(&mut self) {
        self.elements.clear();
        self.data.clear();
        self.failures.clear();
        self.initial_element = None;
        debug!("model cleared");
    }

    pub fn set_initial_element(&mut self, name: &str) -> ModelResult<()> {
        self.require_element(name)?;
        self.initial_element = Some(name.to_string());
        debug!(element = name, "initial element set");
        Ok(())
    }

    // --- elements ---

    fn check_time(name: &str, time: f64) -> ModelResult<()> {
        if !time.is_finite() || time <= 0.0 {
            return Err(ModelError::BadTime {
                element: name.to_string(),
                time,
            });
        }
        Ok(())
    }

    fn check_repetitions(name: &str, repetitions: u32) -> ModelResult<()> {
        if repetitions < 1 {
            return Err(ModelError::BadRepetitions {
                element: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn add_element(&mut self, name: &str, time: f64, repetitions: u32) -> ModelResult<()> {
        self.check_new_name(name)?;
        Self::check_time(name, time)?;
        Self::check_repetitions(name, repetitions)?;
        self.elements
            .insert(name.to_string(), Element::new(time, repetitions));
        debug!(element = name, "element added");
        Ok(())
    }

    pub fn update_element_time(&mut self, name: &str, time: f64) -> ModelResult<()> {
        self.require_element(name)?;
        Self::check_time(name, time)?;
        if let Some(element) = self.elements.get_mut(name) {
            element.time = time;
        }
        Ok(())
    }

    pub fn update_element_repetitions(&mut self, name: &str, repetitions: u32) -> ModelResult<()> {
        self.require_element(name)?;
        Self::check_repetitions(name, repetitions)?;
        if let Some(element) = self.elements.get_mut(name) {
            element.repetitions = repetitions;
        }
        Ok(())
    }

    /// Replace the raw control-flow command text of an element.
    pub fn set_cf_commands(&mut self, name: &str, commands: Vec<String>) -> ModelResult<()> {
        self.require_element(name)?;
        if let Some(element) = self.elements.get_mut(name) {
            element.cf_commands = commands;
        }
        Ok(())
    }

    /// Replace the raw error-propagation command text of an element.
    pub fn set_ep_commands(&mut self, name: &str, commands: Vec<String>) -> ModelResult<()> {
        self.require_element(name)?;
        if let Some(element) = self.elements.get_mut(name) {
            element.ep_commands = commands;
        }
        Ok(())
    }

    /// Remove an element, cascading all arcs that touch it first.
    pub fn remove_element(&mut self, name: &str) -> ModelResult<()> {
        let element = self.require_element(name)?;
        let cf_inputs = element.cf_inputs.clone();
        let cf_outputs = element.cf_outputs.clone();
        let df_inputs = element.df_inputs.clone();
        let df_outputs = element.df_outputs.clone();

        for from in &cf_inputs {
            self.remove_control_flow(from, name)?;
        }
        // a self-loop sat in both lists and is already gone
        for to in cf_outputs.iter().filter(|to| to.as_str() != name) {
            self.remove_control_flow(name, to)?;
        }
        for data in &df_inputs {
            self.remove_data_flow(data, name)?;
        }
        for data in &df_outputs {
            self.remove_data_flow(name, data)?;
        }

        self.elements.remove(name);
        if self.initial_element.as_deref() == Some(name) {
            self.initial_element = None;
        }
        debug!(element = name, "element removed");
        Ok(())
    }

    // --- data ---

    fn check_data_values(
        &self,
        data_name: &str,
        values: &[Value],
        initial_value: &Value,
    ) -> ModelResult<()> {
        if values.is_empty() {
            return Err(ModelError::EmptyValueSet {
                data: data_name.to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for value in values {
            if !seen.insert(value) {
                return Err(ModelError::DuplicateValue {
                    data: data_name.to_string(),
                    value: value.to_string(),
                });
            }
            if let Some(token) = value.as_name() {
                if let Err(source) = check_name(token) {
                    return Err(ModelError::BadValueName {
                        data: data_name.to_string(),
                        value: token.to_string(),
                        source,
                    });
                }
                if let Some(existing) = self.existing_kind(token) {
                    return Err(ModelError::ValueNameClash {
                        data: data_name.to_string(),
                        value: token.to_string(),
                        existing,
                    });
                }
            }
        }
        if !values.contains(initial_value) {
            return Err(ModelError::InitialValueNotInSet {
                data: data_name.to_string(),
                value: initial_value.to_string(),
            });
        }
        Ok(())
    }

    pub fn add_data(
        &mut self,
        name: &str,
        values: Vec<Value>,
        initial_value: Value,
    ) -> ModelResult<()> {
        self.check_new_name(name)?;
        self.check_data_values(name, &values, &initial_value)?;
        self.data
            .insert(name.to_string(), Data::new(values, initial_value));
        debug!(data = name, "data added");
        Ok(())
    }

    /// Add a data slot with the conventional `ok`/`error` domain.
    pub fn add_data_default(&mut self, name: &str) -> ModelResult<()> {
        self.add_data(name, vec!["ok".into(), "error".into()], "ok".into())
    }

    pub fn update_data_values(
        &mut self,
        name: &str,
        values: Vec<Value>,
        initial_value: Value,
    ) -> ModelResult<()> {
        self.require_data(name)?;
        self.check_data_values(name, &values, &initial_value)?;
        if let Some(data) = self.data.get_mut(name) {
            data.values = values;
            data.initial_value = initial_value;
        }
        Ok(())
    }

    /// Remove a data slot, cascading all data-flow arcs that touch it first.
    pub fn remove_data(&mut self, name: &str) -> ModelResult<()> {
        let data = self.require_data(name)?;
        let producers = data.producers.clone();
        let consumers = data.consumers.clone();

        for element in &producers {
            self.remove_data_flow(element, name)?;
        }
        for element in &consumers {
            self.remove_data_flow(name, element)?;
        }

        self.data.remove(name);
        debug!(data = name, "data removed");
        Ok(())
    }

    // --- control-flow arcs ---

    pub fn add_control_flow(&mut self, from: &str, to: &str) -> ModelResult<()> {
        let from_el = self.require_element(from)?;
        let duplicate = from_el.cf_outputs.iter().any(|n| n == to);
        let to_el = self.require_element(to)?;
        if duplicate || to_el.cf_inputs.iter().any(|n| n == from) {
            return Err(ModelError::DuplicateControlFlow {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        if let Some(element) = self.elements.get_mut(from) {
            element.cf_outputs.push(to.to_string());
        }
        if let Some(element) = self.elements.get_mut(to) {
            element.cf_inputs.push(from.to_string());
        }
        debug!(from, to, "control flow arc added");
        Ok(())
    }

    pub fn remove_control_flow(&mut self, from: &str, to: &str) -> ModelResult<()> {
        let from_el = self.require_element(from)?;
        let present = from_el.cf_outputs.iter().any(|n| n == to);
        let to_el = self.require_element(to)?;
        if !present || !to_el.cf_inputs.iter().any(|n| n == from) {
            return Err(ModelError::NoSuchControlFlow {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        if let Some(element) = self.elements.get_mut(from) {
            remove_entry(&mut element.cf_outputs, to);
        }
        if let Some(element) = self.elements.get_mut(to) {
            remove_entry(&mut element.cf_inputs, from);
        }
        debug!(from, to, "control flow arc removed");
        Ok(())
    }

    // --- data-flow arcs ---

    fn df_endpoint(&self, name: &str) -> ModelResult<bool> {
        // true = element, false = data
        if self.elements.contains_key(name) {
            Ok(true)
        } else if self.data.contains_key(name) {
            Ok(false)
        } else {
            Err(ModelError::UnknownEntity {
                name: name.to_string(),
            })
        }
    }

    /// Add a data-flow arc. Direction decides the role: element -> data
    /// records a producer, data -> element records a consumer. Data flow is
    /// strictly bipartite.
    pub fn add_data_flow(&mut self, from: &str, to: &str) -> ModelResult<()> {
        let from_is_element = self.df_endpoint(from)?;
        let to_is_element = self.df_endpoint(to)?;
        match (from_is_element, to_is_element) {
            (true, true) => Err(ModelError::DataFlowBetweenElements {
                from: from.to_string(),
                to: to.to_string(),
            }),
            (false, false) => Err(ModelError::DataFlowBetweenData {
                from: from.to_string(),
                to: to.to_string(),
            }),
            (true, false) => {
                // element writes data slot
                if self.elements[from].df_outputs.iter().any(|n| n == to)
                    || self.data[to].producers.iter().any(|n| n == from)
                {
                    return Err(ModelError::DuplicateDataFlow {
                        from: from.to_string(),
                        to: to.to_string(),
                    });
                }
                if let Some(element) = self.elements.get_mut(from) {
                    element.df_outputs.push(to.to_string());
                }
                if let Some(data) = self.data.get_mut(to) {
                    data.producers.push(from.to_string());
                }
                debug!(from, to, "data flow arc added");
                Ok(())
            }
            (false, true) => {
                // element reads data slot
                if self.elements[to].df_inputs.iter().any(|n| n == from)
                    || self.data[from].consumers.iter().any(|n| n == to)
                {
                    return Err(ModelError::DuplicateDataFlow {
                        from: from.to_string(),
                        to: to.to_string(),
                    });
                }
                if let Some(element) = self.elements.get_mut(to) {
                    element.df_inputs.push(from.to_string());
                }
                if let Some(data) = self.data.get_mut(from) {
                    data.consumers.push(to.to_string());
                }
                debug!(from, to, "data flow arc added");
                Ok(())
            }
        }
    }

    pub fn remove_data_flow(&mut self, from: &str, to: &str) -> ModelResult<()> {
        let from_is_element = self.df_endpoint(from)?;
        if from_is_element {
            let present = self.elements[from].df_outputs.iter().any(|n| n == to)
                && self
                    .data
                    .get(to)
                    .is_some_and(|d| d.producers.iter().any(|n| n == from));
            if !present {
                return Err(ModelError::NoSuchDataFlow {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
            if let Some(element) = self.elements.get_mut(from) {
                remove_entry(&mut element.df_outputs, to);
            }
            if let Some(data) = self.data.get_mut(to) {
                remove_entry(&mut data.producers, from);
            }
        } else {
            let present = self.data[from].consumers.iter().any(|n| n == to)
                && self
                    .elements
                    .get(to)
                    .is_some_and(|e| e.df_inputs.iter().any(|n| n == from));
            if !present {
                return Err(ModelError::NoSuchDataFlow {
                    from: from.to_string(),
                    to: to.to_string(),
                });
            }
            if let Some(data) = self.data.get_mut(from) {
                remove_entry(&mut data.consumers, to);
            }
            if let Some(element) = self.elements.get_mut(to) {
                remove_entry(&mut element.df_inputs, from);
            }
        }
        debug!(from, to, "data flow arc removed");
        Ok(())
    }

    // --- failures ---

    pub fn add_failure(&mut self, name: &str, expression: &str) -> ModelResult<()> {
        self.check_new_name(name)?;
        self.failures
            .insert(name.to_string(), expression.to_string());
        debug!(failure = name, "failure added");
        Ok(())
    }

    pub fn update_failure(&mut self, name: &str, expression: &str) -> ModelResult<()> {
        if !self.failures.contains_key(name) {
            return Err(ModelError::NoSuchFailure {
                name: name.to_string(),
            });
        }
        self.failures
            .insert(name.to_string(), expression.to_string());
        Ok(())
    }

    pub fn remove_failure(&mut self, name: &str) -> ModelResult<()> {
        if self.failures.remove(name).is_none() {
            return Err(ModelError::NoSuchFailure {
                name: name.to_string(),
            });
        }
        debug!(failure = name, "failure removed");
        Ok(())
    }

    // --- sub-models ---

    /// Create an empty sub-model under an element, pre-populated with the
    /// element's boundary data slots. Clears any manual error-propagation
    /// text and resets the execution time (the reduced sub-model will own
    /// both).
    pub fn create_sub_model(&mut self, el_name: &str) -> ModelResult<()> {
        let element = self.require_element(el_name)?;
        if element.sub_model.is_some() {
            return Err(ModelError::SubModelExists {
                element: el_name.to_string(),
            });
        }
        let boundary: BTreeSet<String> = element
            .df_inputs
            .iter()
            .chain(element.df_outputs.iter())
            .cloned()
            .collect();

        let mut sub_model = Model::new();
        for d_name in &boundary {
            let data = self.require_data(d_name)?;
            sub_model.add_data(d_name, data.values.clone(), data.initial_value.clone())?;
        }

        if let Some(element) = self.elements.get_mut(el_name) {
            element.sub_model = Some(Box::new(sub_model));
            element.ep_commands.clear();
            element.time = 1.0;
        }
        debug!(element = el_name, "sub-model created");
        Ok(())
    }

    /// Attach an already-built model as the sub-model of an element.
    pub fn attach_sub_model(&mut self, el_name: &str, sub_model: Model) -> ModelResult<()> {
        let element = self.require_element(el_name)?;
        if element.sub_model.is_some() {
            return Err(ModelError::SubModelExists {
                element: el_name.to_string(),
            });
        }
        if let Some(element) = self.elements.get_mut(el_name) {
            element.sub_model = Some(Box::new(sub_model));
        }
        Ok(())
    }

    /// Discard the sub-model of an element.
    pub fn remove_sub_model(&mut self, el_name: &str) -> ModelResult<()> {
        let element = self.require_element(el_name)?;
        if element.sub_model.is_none() {
            return Err(ModelError::NoSubModel {
                element: el_name.to_string(),
            });
        }
        if let Some(element) = self.elements.get_mut(el_name) {
            element.sub_model = None;
        }
        debug!(element = el_name, "sub-model removed");
        Ok(())
    }

    /// Mutable access to an element's sub-model, for in-place reduction.
    pub fn sub_model_mut(&mut self, el_name: &str) -> Option<&mut Model> {
        self.elements
            .get_mut(el_name)
            .and_then(|e| e.sub_model.as_deref_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_element_model() -> Model {
        let mut model = Model::new();
        model.add_element("a", 1.0, 1).unwrap();
        model.add_element("b", 1.0, 1).unwrap();
        model
    }

    #[test]
    fn add_element_rejects_reserved_and_duplicate() {
        let mut model = two_element_model();
        assert!(matches!(
            model.add_element("dtmc", 1.0, 1),
            Err(ModelError::Name(_))
        ));
        assert!(matches!(
            model.add_element("a", 1.0, 1),
            Err(ModelError::DuplicateName { .. })
        ));
    }

    #[test]
    fn add_element_rejects_bad_time_and_repetitions() {
        let mut model = Model::new();
        assert!(matches!(
            model.add_element("x", 0.0, 1),
            Err(ModelError::BadTime { .. })
        ));
        assert!(matches!(
            model.add_element("x", f64::NAN, 1),
            Err(ModelError::BadTime { .. })
        ));
        assert!(matches!(
            model.add_element("x", 1.0, 0),
            Err(ModelError::BadRepetitions { .. })
        ));
        // nothing was inserted by the failed attempts
        assert!(model.elements().is_empty());
    }

    #[test]
    fn control_flow_round_trip_is_idempotent() {
        let mut model = two_element_model();
        model.add_control_flow("a", "b").unwrap();
        assert_eq!(model.element("a").unwrap().cf_outputs, ["b"]);
        assert_eq!(model.element("b").unwrap().cf_inputs, ["a"]);

        model.remove_control_flow("a", "b").unwrap();
        assert!(model.element("a").unwrap().cf_outputs.is_empty());
        assert!(model.element("b").unwrap().cf_inputs.is_empty());

        // and again, to prove nothing desynchronized
        model.add_control_flow("a", "b").unwrap();
        model.remove_control_flow("a", "b").unwrap();
        assert_eq!(model.element("a").unwrap(), &Element::new(1.0, 1));
    }

    #[test]
    fn duplicate_control_flow_rejected() {
        let mut model = two_element_model();
        model.add_control_flow("a", "b").unwrap();
        assert!(matches!(
            model.add_control_flow("a", "b"),
            Err(ModelError::DuplicateControlFlow { .. })
        ));
        // reverse direction is a different arc
        model.add_control_flow("b", "a").unwrap();
    }

    #[test]
    fn data_flow_is_bipartite() {
        let mut model = two_element_model();
        model.add_data_default("d1").unwrap();
        model.add_data("d2", vec!["ok".into(), "bad".into()], "ok".into()).unwrap();

        assert!(matches!(
            model.add_data_flow("a", "b"),
            Err(ModelError::DataFlowBetweenElements { .. })
        ));
        assert!(matches!(
            model.add_data_flow("d1", "d2"),
            Err(ModelError::DataFlowBetweenData { .. })
        ));

        model.add_data_flow("a", "d1").unwrap(); // a writes d1
        model.add_data_flow("d1", "b").unwrap(); // b reads d1
        assert_eq!(model.element("a").unwrap().df_outputs, ["d1"]);
        assert_eq!(model.element("b").unwrap().df_inputs, ["d1"]);
        assert_eq!(model.data_slot("d1").unwrap().producers, ["a"]);
        assert_eq!(model.data_slot("d1").unwrap().consumers, ["b"]);
    }

    #[test]
    fn remove_element_cascades_arcs() {
        let mut model = two_element_model();
        model.add_element("c", 1.0, 1).unwrap();
        model.add_data_default("d").unwrap();
        model.add_control_flow("a", "b").unwrap();
        model.add_control_flow("b", "c").unwrap();
        model.add_data_flow("b", "d").unwrap();
        model.add_data_flow("d", "c").unwrap();
        model.set_initial_element("b").unwrap();

        model.remove_element("b").unwrap();

        assert!(model.element("b").is_none());
        assert!(model.element("a").unwrap().cf_outputs.is_empty());
        assert!(model.element("c").unwrap().cf_inputs.is_empty());
        assert!(model.data_slot("d").unwrap().producers.is_empty());
        assert_eq!(model.initial_element(), None);
    }

    #[test]
    fn remove_element_with_self_loop() {
        let mut model = two_element_model();
        model.add_control_flow("a", "a").unwrap();
        model.add_control_flow("a", "b").unwrap();
        model.remove_element("a").unwrap();
        assert!(model.element("a").is_none());
        assert!(model.element("b").unwrap().cf_inputs.is_empty());
    }

    #[test]
    fn remove_data_cascades_arcs() {
        let mut model = two_element_model();
        model.add_data_default("d").unwrap();
        model.add_data_flow("a", "d").unwrap();
        model.add_data_flow("d", "b").unwrap();

        model.remove_data("d").unwrap();

        assert!(model.data_slot("d").is_none());
        assert!(model.element("a").unwrap().df_outputs.is_empty());
        assert!(model.element("b").unwrap().df_inputs.is_empty());
    }

    #[test]
    fn data_values_validated() {
        let mut model = Model::new();
        model.add_element("a", 1.0, 1).unwrap();

        // ok/error with initial ok passes
        model
            .add_data("d", vec!["ok".into(), "error".into()], "ok".into())
            .unwrap();

        // initial value outside the set fails
        assert!(matches!(
            model.update_data_values("d", vec!["ok".into(), "error".into()], "late".into()),
            Err(ModelError::InitialValueNotInSet { .. })
        ));

        // string value colliding with an element name fails
        assert!(matches!(
            model.add_data("e", vec!["a".into(), "error".into()], "error".into()),
            Err(ModelError::ValueNameClash { .. })
        ));

        // duplicate values fail
        assert!(matches!(
            model.add_data("f", vec!["ok".into(), "ok".into()], "ok".into()),
            Err(ModelError::DuplicateValue { .. })
        ));
    }

    #[test]
    fn sub_model_lifecycle() {
        let mut model = two_element_model();
        model.add_data_default("d_in").unwrap();
        model.add_data_default("d_out").unwrap();
        model.add_data_flow("d_in", "a").unwrap();
        model.add_data_flow("a", "d_out").unwrap();
        model.set_ep_commands("a", vec!["(true) -> 1:(d_out'=ok);".into()]).unwrap();

        model.create_sub_model("a").unwrap();
        let element = model.element("a").unwrap();
        let sub = element.sub_model.as_deref().unwrap();
        // boundary data was copied in, manual ep text dropped
        assert!(sub.data_slot("d_in").is_some());
        assert!(sub.data_slot("d_out").is_some());
        assert!(element.ep_commands.is_empty());
        assert_eq!(element.time, 1.0);

        assert!(matches!(
            model.create_sub_model("a"),
            Err(ModelError::SubModelExists { .. })
        ));

        model.remove_sub_model("a").unwrap();
        assert!(model.element("a").unwrap().sub_model.is_none());
        assert!(matches!(
            model.remove_sub_model("a"),
            Err(ModelError::NoSubModel { .. })
        ));
    }
}
