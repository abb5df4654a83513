//! Model-specific error types.
//!
//! Every mutating operation on [`crate::Model`] fails fast with one of
//! these; on error the model is observably unchanged.

use fp_core::NameError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{0}")]
    Name(#[from] NameError),

    #[error("Name \"{name}\" already exists as {existing}")]
    DuplicateName { name: String, existing: &'static str },

    #[error("No element \"{name}\"")]
    NoSuchElement { name: String },

    #[error("No data \"{name}\"")]
    NoSuchData { name: String },

    #[error("No failure \"{name}\"")]
    NoSuchFailure { name: String },

    #[error("Neither element nor data \"{name}\"")]
    UnknownEntity { name: String },

    #[error("Time value of \"{element}\" must be positive and finite, got {time}")]
    BadTime { element: String, time: f64 },

    #[error("Repetitions value of \"{element}\" is less than 1")]
    BadRepetitions { element: String },

    #[error("Control flow \"{from}\" -> \"{to}\" already exists")]
    DuplicateControlFlow { from: String, to: String },

    #[error("No control flow arc \"{from}\" -> \"{to}\"")]
    NoSuchControlFlow { from: String, to: String },

    #[error("Data flow arc \"{from}\" -> \"{to}\" already exists")]
    DuplicateDataFlow { from: String, to: String },

    #[error("No data flow arc \"{from}\" -> \"{to}\"")]
    NoSuchDataFlow { from: String, to: String },

    #[error("Data flow from an element to an element is forbidden")]
    DataFlowBetweenElements { from: String, to: String },

    #[error("Data flow from a data to a data is forbidden")]
    DataFlowBetweenData { from: String, to: String },

    #[error("Data \"{data}\" has an empty value set")]
    EmptyValueSet { data: String },

    #[error("Duplicate value \"{value}\" in value set of \"{data}\"")]
    DuplicateValue { data: String, value: String },

    #[error("Bad value \"{value}\" of \"{data}\": {source}")]
    BadValueName {
        data: String,
        value: String,
        source: NameError,
    },

    #[error("Value \"{value}\" of \"{data}\" collides with {existing} of the same name")]
    ValueNameClash {
        data: String,
        value: String,
        existing: &'static str,
    },

    #[error("Initial value \"{value}\" of \"{data}\" is not in the value set")]
    InitialValueNotInSet { data: String, value: String },

    #[error("Element \"{element}\" already contains a sub-model")]
    SubModelExists { element: String },

    #[error("Element \"{element}\" has no sub-model")]
    NoSubModel { element: String },
}
