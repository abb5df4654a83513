//! Document ↔ model conversion.

use fp_model::{Model, Value};

use crate::schema::{ArcDoc, DataDoc, ElementDoc, FailureDoc, ModelDoc, ValueDoc};
use crate::{ProjectError, ProjectResult};

impl From<&Value> for ValueDoc {
    fn from(value: &Value) -> Self {
        match value {
            Value::Int(i) => ValueDoc::Int(*i),
            Value::Name(s) => ValueDoc::Name(s.clone()),
        }
    }
}

impl From<&ValueDoc> for Value {
    fn from(value: &ValueDoc) -> Self {
        match value {
            ValueDoc::Int(i) => Value::Int(*i),
            ValueDoc::Name(s) => Value::Name(s.clone()),
        }
    }
}

/// Serialize a model tree into its document form.
pub fn to_document(model: &Model) -> ModelDoc {
    let mut doc = ModelDoc {
        initial_element: model.initial_element().map(str::to_string),
        elements: Vec::new(),
        data: Vec::new(),
        control_flows: Vec::new(),
        data_flows: Vec::new(),
        failures: Vec::new(),
    };

    for (name, element) in model.elements() {
        doc.elements.push(ElementDoc {
            name: name.clone(),
            time: element.time,
            repetitions: element.repetitions,
            cf_commands: element.cf_commands.clone(),
            ep_commands: element.ep_commands.clone(),
            sub_model: element
                .sub_model
                .as_deref()
                .map(|sub| Box::new(to_document(sub))),
        });
        for to in &element.cf_outputs {
            doc.control_flows.push(ArcDoc {
                from: name.clone(),
                to: to.clone(),
            });
        }
        // producer arcs element -> data, consumer arcs data -> element
        for data in &element.df_outputs {
            doc.data_flows.push(ArcDoc {
                from: name.clone(),
                to: data.clone(),
            });
        }
        for data in &element.df_inputs {
            doc.data_flows.push(ArcDoc {
                from: data.clone(),
                to: name.clone(),
            });
        }
    }

    for (name, data) in model.data() {
        doc.data.push(DataDoc {
            name: name.clone(),
            values: data.values.iter().map(ValueDoc::from).collect(),
            initial_value: Some(ValueDoc::from(&data.initial_value)),
        });
    }

    for (name, expression) in model.failures() {
        doc.failures.push(FailureDoc {
            name: name.clone(),
            expression: expression.clone(),
        });
    }

    doc
}

/// Build a model tree from a document, replaying the model operations so
/// every structural invariant is re-validated on load.
pub fn to_model(doc: &ModelDoc) -> ProjectResult<Model> {
    let mut model = Model::new();

    for element in &doc.elements {
        model.add_element(&element.name, element.time, element.repetitions)?;
        if !element.cf_commands.is_empty() {
            model.set_cf_commands(&element.name, element.cf_commands.clone())?;
        }
        if !element.ep_commands.is_empty() {
            model.set_ep_commands(&element.name, element.ep_commands.clone())?;
        }
    }

    for data in &doc.data {
        let values: Vec<Value> = if data.values.is_empty() {
            vec!["ok".into(), "error".into()]
        } else {
            data.values.iter().map(Value::from).collect()
        };
        let initial = match &data.initial_value {
            Some(v) => Value::from(v),
            None => values[0].clone(),
        };
        model.add_data(&data.name, values, initial)?;
    }

    for arc in &doc.control_flows {
        model.add_control_flow(&arc.from, &arc.to)?;
    }
    for arc in &doc.data_flows {
        model.add_data_flow(&arc.from, &arc.to)?;
    }
    for failure in &doc.failures {
        model.add_failure(&failure.name, &failure.expression)?;
    }
    if let Some(initial) = &doc.initial_element {
        model.set_initial_element(initial)?;
    }

    for element in &doc.elements {
        if let Some(sub_doc) = &element.sub_model {
            let sub_model = to_model(sub_doc)?;
            model.attach_sub_model(&element.name, sub_model)?;
        }
    }

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample_model() -> Model {
        let mut model = Model::new();
        model.add_element("ingest", 1.0, 1).unwrap();
        model.add_element("transform", 2.5, 3).unwrap();
        model.add_control_flow("ingest", "transform").unwrap();
        model
            .add_data(
                "d_level",
                vec![Value::Int(0), Value::Int(1), "overflow".into()],
                Value::Int(0),
            )
            .unwrap();
        model.add_data_default("d_state").unwrap();
        model.add_data_flow("ingest", "d_level").unwrap();
        model.add_data_flow("d_level", "transform").unwrap();
        model.add_data_flow("transform", "d_state").unwrap();
        model
            .add_failure("overflowed", "d_level=overflow")
            .unwrap();
        model.set_initial_element("ingest").unwrap();
        model
            .set_ep_commands(
                "transform",
                vec!["(d_level=0) -> 1:(d_state'=ok);".to_string()],
            )
            .unwrap();

        model.create_sub_model("transform").unwrap();
        let sub = model.sub_model_mut("transform").unwrap();
        sub.add_element("vote", 1.0, 1).unwrap();
        sub.add_data_flow("d_level", "vote").unwrap();
        sub.add_data_flow("vote", "d_state").unwrap();
        sub.set_initial_element("vote").unwrap();
        model
    }

    fn arc_set(doc: &ModelDoc) -> BTreeSet<(String, String)> {
        doc.control_flows
            .iter()
            .chain(doc.data_flows.iter())
            .map(|a| (a.from.clone(), a.to.clone()))
            .collect()
    }

    #[test]
    fn round_trip_preserves_observable_state() {
        let model = sample_model();
        let doc = to_document(&model);
        let restored = to_model(&doc).unwrap();

        assert_eq!(model.initial_element(), restored.initial_element());
        assert_eq!(
            model.elements().keys().collect::<Vec<_>>(),
            restored.elements().keys().collect::<Vec<_>>()
        );
        assert_eq!(model.data(), restored.data());
        assert_eq!(model.failures(), restored.failures());
        assert_eq!(arc_set(&doc), arc_set(&to_document(&restored)));

        let original = model.element("transform").unwrap();
        let roundtripped = restored.element("transform").unwrap();
        assert_eq!(original.time, roundtripped.time);
        assert_eq!(original.repetitions, roundtripped.repetitions);
        assert_eq!(original.ep_commands, roundtripped.ep_commands);
        assert_eq!(
            original.sub_model.as_deref().unwrap().element_names(),
            roundtripped.sub_model.as_deref().unwrap().element_names()
        );
    }

    #[test]
    fn document_serde_round_trip() {
        let doc = to_document(&sample_model());
        let json = serde_json::to_string_pretty(&doc).unwrap();
        let parsed: ModelDoc = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, parsed);

        let yaml = serde_yaml::to_string(&doc).unwrap();
        let parsed: ModelDoc = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(doc, parsed);
    }

    #[test]
    fn loading_replays_validation() {
        let mut doc = to_document(&sample_model());
        // duplicate arc in the document must be rejected like a live edit
        doc.control_flows.push(ArcDoc {
            from: "ingest".to_string(),
            to: "transform".to_string(),
        });
        assert!(matches!(
            to_model(&doc),
            Err(ProjectError::Model(
                fp_model::ModelError::DuplicateControlFlow { .. }
            ))
        ));
    }

    #[test]
    fn missing_values_default_to_ok_error() {
        let doc = ModelDoc {
            initial_element: None,
            elements: Vec::new(),
            data: vec![DataDoc {
                name: "d".to_string(),
                values: Vec::new(),
                initial_value: None,
            }],
            control_flows: Vec::new(),
            data_flows: Vec::new(),
            failures: Vec::new(),
        };
        let model = to_model(&doc).unwrap();
        let data = model.data_slot("d").unwrap();
        assert_eq!(data.values, vec![Value::from("ok"), Value::from("error")]);
        assert_eq!(data.initial_value, Value::from("ok"));
    }
}
