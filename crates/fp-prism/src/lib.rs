//! fp-prism: compiles failprop models into PRISM dtmc text and reduces
//! hierarchical models into flat ones.
//!
//! The external model checker is consumed through the [`StochasticSolver`]
//! trait, an injected capability: production code wires in
//! [`PrismProcess`], tests substitute a scripted double. The compiler
//! itself never spawns processes.

pub mod analysis;
pub mod codegen;
pub mod encode;
pub mod error;
pub mod process;
pub mod reduce;
pub mod solver;

pub use analysis::{Series, execution_time, failure_probability, mttf};
pub use codegen::{EmitOptions, default_cf_command, default_ep_commands, emit_model};
pub use encode::ValueEncoding;
pub use error::{EmitError, QueryError, ReduceError, SolverError};
pub use process::PrismProcess;
pub use reduce::reduce;
pub use solver::{StateDistribution, StochasticSolver};
