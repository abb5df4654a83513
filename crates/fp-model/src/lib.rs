//! fp-model: graph/model layer for failprop.
//!
//! Provides:
//! - Core model data structures (Element, Data, Value, Model)
//! - Invariant-preserving mutation operations (arcs stay mirrored,
//!   namespaces stay unique, every mutation is atomic)
//! - The sub-model tree used by hierarchical reduction
//!
//! # Example
//!
//! ```
//! use fp_model::Model;
//!
//! let mut model = Model::new();
//! model.add_element("read", 1.0, 1).unwrap();
//! model.add_element("process", 2.0, 1).unwrap();
//! model.add_control_flow("read", "process").unwrap();
//! model.set_initial_element("read").unwrap();
//!
//! assert_eq!(model.elements().len(), 2);
//! assert_eq!(model.element("process").unwrap().cf_inputs, ["read"]);
//! ```

pub mod data;
pub mod element;
pub mod error;
pub mod model;

// Re-exports for ergonomics
pub use data::{Data, Value};
pub use element::Element;
pub use error::ModelError;
pub use model::Model;

pub type ModelResult<T> = Result<T, ModelError>;
