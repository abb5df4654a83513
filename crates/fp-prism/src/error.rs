//! Error types for compilation, reduction, and solver round-trips.

use fp_model::ModelError;
use thiserror::Error;

/// Errors from the external solver gateway.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("solver I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("solver run failed: {what}")]
    Engine { what: String },

    #[error("solver returned a non-numeric result: \"{got}\"")]
    NonNumeric { got: String },

    #[error("malformed solver output: {what}")]
    Malformed { what: String },
}

/// Errors while emitting flat solver text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("model has no initial element")]
    NoInitialElement,

    #[error("element \"{name}\" references missing data \"{data}\"")]
    MissingData { name: String, data: String },

    #[error("no element \"{name}\"")]
    MissingElement { name: String },
}

/// Errors during hierarchical reduction.
///
/// Any of these is fatal for the reduction step that raised it: the
/// element in question is left untouched rather than rewritten with a
/// command that might be wrong.
#[derive(Error, Debug)]
pub enum ReduceError {
    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(
        "reduction of \"{element}\" produced no output states although the element has data-flow outputs"
    )]
    EmptyAggregate { element: String },
}

/// Errors for one-shot analysis queries.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("no failure \"{name}\"")]
    NoSuchFailure { name: String },
}
