//! fp-core: stable foundation for failprop.
//!
//! Contains:
//! - names (identifier grammar + solver reserved-word checks)
//! - diag (severity-tagged diagnostics, accumulated by the checker)

pub mod diag;
pub mod names;

// Re-exports: nice ergonomics for downstream crates
pub use diag::{Diagnostic, EntityKind, Severity};
pub use names::{NameError, check_name, is_identifier, is_reserved};
