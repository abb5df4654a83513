//! fp-project: canonical document format for failprop model trees.
//!
//! Loading replays the model operations one by one, so a hand-edited or
//! corrupt document fails with the same typed errors as interactive edits
//! and a loaded model always satisfies the structural invariants.

pub mod convert;
pub mod schema;

pub use convert::{to_document, to_model};
pub use schema::*;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Model error: {0}")]
    Model(#[from] fp_model::ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<fp_model::Model> {
    let content = std::fs::read_to_string(path)?;
    let doc: ModelDoc = serde_yaml::from_str(&content)?;
    to_model(&doc)
}

pub fn save_yaml(path: &std::path::Path, model: &fp_model::Model) -> ProjectResult<()> {
    let content = serde_yaml::to_string(&to_document(model))?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<fp_model::Model> {
    let content = std::fs::read_to_string(path)?;
    let doc: ModelDoc = serde_json::from_str(&content)?;
    to_model(&doc)
}

pub fn save_json(path: &std::path::Path, model: &fp_model::Model) -> ProjectResult<()> {
    let content = serde_json::to_string_pretty(&to_document(model))?;
    std::fs::write(path, content)?;
    Ok(())
}
