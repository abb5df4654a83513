//! Document schema definitions.

use serde::{Deserialize, Serialize};

/// One model of the tree; sub-models nest inside their hosting element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_element: Option<String>,
    #[serde(default)]
    pub elements: Vec<ElementDoc>,
    #[serde(default)]
    pub data: Vec<DataDoc>,
    #[serde(default)]
    pub control_flows: Vec<ArcDoc>,
    #[serde(default)]
    pub data_flows: Vec<ArcDoc>,
    #[serde(default)]
    pub failures: Vec<FailureDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementDoc {
    pub name: String,
    #[serde(default = "default_time")]
    pub time: f64,
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cf_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ep_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_model: Option<Box<ModelDoc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataDoc {
    pub name: String,
    /// Empty means the conventional `ok`/`error` domain.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ValueDoc>,
    /// Absent means the first value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<ValueDoc>,
}

/// A data value: integer or identifier string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ValueDoc {
    Int(u32),
    Name(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArcDoc {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailureDoc {
    pub name: String,
    pub expression: String,
}

fn default_time() -> f64 {
    1.0
}

fn default_repetitions() -> u32 {
    1
}
