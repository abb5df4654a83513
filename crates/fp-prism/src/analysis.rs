//! One-shot analysis queries over a flat model.
//!
//! Each query emits the model text, appends the failure formula and
//! reward structures it needs, and asks the solver. A non-numeric scalar
//! result is surfaced as an error and treated as 0 rather than aborting,
//! so a batch of queries over a half-broken model still completes.

use std::fmt::Write as _;

use fp_model::Model;
use tracing::error;

use crate::codegen::{EmitOptions, emit_model};
use crate::error::{QueryError, SolverError};
use crate::solver::StochasticSolver;

/// A step-indexed result series: `values[i]` belongs to `steps[i]`, which
/// corresponds to accumulated model time `times[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub steps: Vec<u32>,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

fn failure_formula(model: &Model, failure: &str) -> Result<String, QueryError> {
    let expression = model
        .failure(failure)
        .ok_or_else(|| QueryError::NoSuchFailure {
            name: failure.to_string(),
        })?;
    Ok(format!(
        "// failure formula\nformula {failure} = {expression};\n"
    ))
}

fn scalar_or_zero(
    solver: &dyn StochasticSolver,
    model_text: &str,
    property: &str,
) -> Result<f64, QueryError> {
    match solver.scalar(model_text, property) {
        Ok(value) => Ok(value),
        Err(SolverError::NonNumeric { got }) => {
            error!(got, property, "non-numeric solver result, treating as 0");
            Ok(0.0)
        }
        Err(e) => Err(e.into()),
    }
}

/// Expected total execution time of the model: `R{"time"}=? [ C ]`.
pub fn execution_time(model: &Model, solver: &dyn StochasticSolver) -> Result<f64, QueryError> {
    let text = emit_model(
        model,
        &EmitOptions {
            skip_ep_module: true,
            time_reward: true,
            ..EmitOptions::default()
        },
    )?;
    scalar_or_zero(solver, &text, "R{\"time\"}=? [ C ]")
}

/// Probability of ever reaching the failure: `P=? [ F <failure> ]`.
pub fn failure_probability(
    model: &Model,
    solver: &dyn StochasticSolver,
    failure: &str,
) -> Result<f64, QueryError> {
    let mut text = emit_model(model, &EmitOptions::default())?;
    text.push_str(&failure_formula(model, failure)?);
    scalar_or_zero(solver, &text, &format!("P=? [ F {failure} ]"))
}

/// Mean time to failure: accumulated time reward until the failure holds.
pub fn mttf(
    model: &Model,
    solver: &dyn StochasticSolver,
    failure: &str,
) -> Result<f64, QueryError> {
    let mut text = emit_model(
        model,
        &EmitOptions {
            time_reward: true,
            ..EmitOptions::default()
        },
    )?;
    text.push_str(&failure_formula(model, failure)?);
    scalar_or_zero(solver, &text, &format!("R{{\"time\"}}=? [ F {failure} ]"))
}

fn step_model(model: &Model, failure: &str) -> Result<String, QueryError> {
    let mut text = emit_model(
        model,
        &EmitOptions {
            time_reward: true,
            ..EmitOptions::default()
        },
    )?;
    text.push_str(&failure_formula(model, failure)?);
    text.push_str("// step constant for properties\nconst int step;\n");
    Ok(text)
}

fn zip_series(
    value_rows: Vec<(u32, f64)>,
    time_rows: Vec<(u32, f64)>,
) -> Series {
    let mut series = Series::default();
    for (i, (step, value)) in value_rows.into_iter().enumerate() {
        series.steps.push(step);
        series.values.push(value);
        series.times.push(time_rows.get(i).map_or(0.0, |(_, t)| *t));
    }
    series
}

/// Time-bounded failure probability over a `start:step:end` range.
pub fn probability_series(
    model: &Model,
    solver: &dyn StochasticSolver,
    failure: &str,
    range: &str,
) -> Result<Series, QueryError> {
    let text = step_model(model, failure)?;
    let values = solver.step_series(&text, &format!("P=? [ F<=step {failure} ]"), range)?;
    let times = solver.step_series(&text, "R{\"time\"}=? [ C<=step ]", range)?;
    Ok(zip_series(values, times))
}

/// Expected number of steps spent in the failure state over a step range.
pub fn failure_count_series(
    model: &Model,
    solver: &dyn StochasticSolver,
    failure: &str,
    range: &str,
) -> Result<Series, QueryError> {
    let mut text = step_model(model, failure)?;
    let _ = write!(
        text,
        "// failure reward\nrewards \"failures\"\n\t{failure}:1;\nendrewards\n"
    );
    let values = solver.step_series(&text, "R{\"failures\"}=? [ C<=step ]", range)?;
    let times = solver.step_series(&text, "R{\"time\"}=? [ C<=step ]", range)?;
    Ok(zip_series(values, times))
}

/// Accumulated time spent failed, weighted per element, over a step range.
pub fn downtime_series(
    model: &Model,
    solver: &dyn StochasticSolver,
    failure: &str,
    range: &str,
) -> Result<Series, QueryError> {
    let mut text = step_model(model, failure)?;
    text.push_str("// downtime reward\nrewards \"downtime\"\n");
    for (name, element) in model.elements() {
        let _ = writeln!(text, "\t{failure} & cf={name}:{};", element.time);
    }
    text.push_str("endrewards\n");
    let values = solver.step_series(&text, "R{\"downtime\"}=? [ C<=step ]", range)?;
    let times = solver.step_series(&text, "R{\"time\"}=? [ C<=step ]", range)?;
    Ok(zip_series(values, times))
}
