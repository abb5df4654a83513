//! fp-check: read-only validation for failprop models.
//!
//! The model layer enforces structural invariants at mutation time; this
//! crate covers everything that needs whole-model context: the embedded
//! command languages, failure expressions, cross-boundary data flow of
//! sub-models, and the initial-element requirement.
//!
//! All findings are accumulated into a [`Report`]; a full pass never
//! stops at the first problem, so one validation run yields the complete
//! diagnostic set.

pub mod checker;
pub mod lexer;
pub mod report;

pub use checker::{
    check_data, check_element, check_failure, check_model, check_model_with_host, check_tree,
};
pub use lexer::{Token, ident_tokens, tokenize};
pub use report::Report;
