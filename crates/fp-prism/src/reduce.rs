//! Hierarchical reduction.
//!
//! Collapses compound elements (nested sub-models) and repeated elements
//! into plain leaf elements carrying synthesized error-propagation
//! commands. Works bottom-up over the sub-model tree: for every
//! combination of an element's data-flow input values, a scoped model is
//! emitted, the external solver returns the resulting distribution over
//! output values, and the aggregated distribution becomes one guarded,
//! probability-weighted command.
//!
//! A solver failure or an empty aggregate aborts the current reduction
//! step with the element untouched, since a wrong synthesized command would
//! silently corrupt every ancestor model.

use std::collections::BTreeMap;

use fp_model::{Model, Value};
use tracing::info;

use crate::codegen::{EmitOptions, emit_model, emit_repetition_model};
use crate::encode::ValueEncoding;
use crate::error::{EmitError, ReduceError};
use crate::solver::StochasticSolver;

/// Reduce every compound and repeated element of `model` (and of all its
/// sub-models, recursively) in place. Afterwards the model tree is a
/// single flat level, ready for [`emit_model`].
pub fn reduce(model: &mut Model, solver: &dyn StochasticSolver) -> Result<(), ReduceError> {
    for el_name in model.element_names() {
        let has_sub = model
            .element(&el_name)
            .is_some_and(|e| e.sub_model.is_some());
        if has_sub {
            info!(element = %el_name, "reducing sub-model");
            if let Some(sub) = model.sub_model_mut(&el_name) {
                reduce(sub, solver)?;
            }
            let commands = compound_commands(model, &el_name, solver)?;
            let time = sub_model_time(model, &el_name, solver)?;
            model.set_ep_commands(&el_name, commands)?;
            model.remove_sub_model(&el_name)?;
            model.update_element_time(&el_name, time)?;
            info!(element = %el_name, time, "sub-model reduced");
        }

        let repetitions = model.element(&el_name).map_or(1, |e| e.repetitions);
        if repetitions > 1 {
            info!(element = %el_name, repetitions, "reducing repetitions");
            let commands = repetition_commands(model, &el_name, solver)?;
            let time = model.element(&el_name).map_or(1.0, |e| e.time);
            model.set_ep_commands(&el_name, commands)?;
            model.update_element_time(&el_name, time * f64::from(repetitions))?;
            model.update_element_repetitions(&el_name, 1)?;
            info!(element = %el_name, "repetitions reduced");
        }
    }
    Ok(())
}

fn require_element<'a>(model: &'a Model, el_name: &str) -> Result<&'a fp_model::Element, EmitError> {
    model.element(el_name).ok_or_else(|| EmitError::MissingElement {
        name: el_name.to_string(),
    })
}

/// All combinations of the given data-flow inputs' values, as ordered
/// `(name, value)` assignments. Deterministic: declared input order, each
/// input's declared value order, first input varying slowest. No inputs
/// yields one empty combination (an unconditional `(true)` guard).
fn input_combinations(
    source: &Model,
    el_name: &str,
    inputs: &[String],
) -> Result<Vec<Vec<(String, Value)>>, ReduceError> {
    let mut combos: Vec<Vec<(String, Value)>> = vec![Vec::new()];
    for input in inputs {
        let data = source
            .data_slot(input)
            .ok_or_else(|| EmitError::MissingData {
                name: el_name.to_string(),
                data: input.clone(),
            })?;
        let mut next = Vec::with_capacity(combos.len() * data.values.len());
        for combo in &combos {
            for value in &data.values {
                let mut extended = combo.clone();
                extended.push((input.clone(), value.clone()));
                next.push(extended);
            }
        }
        combos = next;
    }
    Ok(combos)
}

/// Fold one solver distribution into a guarded command:
/// `(<in>=<v>) & … -> p1:(out'=w) & … + p2:… ;`
fn synthesize_command(
    encoding: &ValueEncoding,
    el_name: &str,
    inputs: &[(String, Value)],
    outputs: &[String],
    distribution: crate::solver::StateDistribution,
) -> Result<String, ReduceError> {
    let mut projected = distribution.project_onto(outputs);
    if projected.variables.is_empty() || projected.states.is_empty() {
        return Err(ReduceError::EmptyAggregate {
            element: el_name.to_string(),
        });
    }
    projected.correct_deficit();

    let guard = if inputs.is_empty() {
        "(true)".to_string()
    } else {
        inputs
            .iter()
            .map(|(name, value)| format!("({name}={value})"))
            .collect::<Vec<_>>()
            .join(" & ")
    };

    let branches: Vec<String> = projected
        .states
        .iter()
        .map(|(values, prob)| {
            let updates: Vec<String> = projected
                .variables
                .iter()
                .zip(values)
                .map(|(name, raw)| format!("({name}'={})", encoding.decode(*raw)))
                .collect();
            format!("{prob}:{}", updates.join(" & "))
        })
        .collect();

    Ok(format!("{guard} -> {};", branches.join(" + ")))
}

/// Synthesized commands for a compound element: one steady-state query of
/// its (already reduced) sub-model per input combination.
fn compound_commands(
    model: &Model,
    el_name: &str,
    solver: &dyn StochasticSolver,
) -> Result<Vec<String>, ReduceError> {
    let element = require_element(model, el_name)?;
    let Some(sub) = element.sub_model.as_deref() else {
        return Ok(Vec::new());
    };
    if element.df_outputs.is_empty() {
        return Ok(Vec::new());
    }

    let encoding = ValueEncoding::from_model(sub);
    let mut commands = Vec::new();
    for combo in input_combinations(sub, el_name, &element.df_inputs)? {
        info!(element = %el_name, inputs = ?combo, "solving sub-model input combination");
        let init: BTreeMap<String, Value> = combo.iter().cloned().collect();
        let text = emit_model(
            sub,
            &EmitOptions {
                init_values: Some(&init),
                ..EmitOptions::default()
            },
        )?;
        let distribution = solver.steady_state(&text)?;
        commands.push(synthesize_command(
            &encoding,
            el_name,
            &combo,
            &element.df_outputs,
            distribution,
        )?);
    }
    Ok(commands)
}

/// Expected execution time of a sub-model: total accumulated time reward.
fn sub_model_time(
    model: &Model,
    el_name: &str,
    solver: &dyn StochasticSolver,
) -> Result<f64, ReduceError> {
    let element = require_element(model, el_name)?;
    let Some(sub) = element.sub_model.as_deref() else {
        return Err(ReduceError::Model(fp_model::ModelError::NoSubModel {
            element: el_name.to_string(),
        }));
    };
    let text = emit_model(
        sub,
        &EmitOptions {
            skip_ep_module: true,
            time_reward: true,
            ..EmitOptions::default()
        },
    )?;
    Ok(solver.scalar(&text, "R{\"time\"}=? [ C ]")?)
}

/// Synthesized commands for a repeated element: one N-step transient
/// query of the element-scoped model per input combination.
fn repetition_commands(
    model: &Model,
    el_name: &str,
    solver: &dyn StochasticSolver,
) -> Result<Vec<String>, ReduceError> {
    let element = require_element(model, el_name)?;
    if element.df_outputs.is_empty() {
        return Ok(Vec::new());
    }
    let repetitions = element.repetitions;

    let encoding = ValueEncoding::from_model(model);
    let mut commands = Vec::new();
    for combo in input_combinations(model, el_name, &element.df_inputs)? {
        info!(element = %el_name, inputs = ?combo, "solving repetition input combination");
        let init: BTreeMap<String, Value> = combo.iter().cloned().collect();
        let text = emit_repetition_model(model, el_name, &init)?;
        let distribution = solver.transient(&text, repetitions)?;
        commands.push(synthesize_command(
            &encoding,
            el_name,
            &combo,
            &element.df_outputs,
            distribution,
        )?);
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverError;
    use crate::solver::StateDistribution;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Scripted solver double: hands out queued distributions in order.
    struct ScriptedSolver {
        distributions: RefCell<VecDeque<StateDistribution>>,
        time: f64,
    }

    impl ScriptedSolver {
        fn new(distributions: Vec<StateDistribution>, time: f64) -> Self {
            Self {
                distributions: RefCell::new(distributions.into()),
                time,
            }
        }
    }

    impl StochasticSolver for ScriptedSolver {
        fn scalar(&self, _model: &str, _property: &str) -> Result<f64, SolverError> {
            Ok(self.time)
        }

        fn step_series(
            &self,
            _model: &str,
            _property: &str,
            _range: &str,
        ) -> Result<Vec<(u32, f64)>, SolverError> {
            Ok(Vec::new())
        }

        fn steady_state(&self, _model: &str) -> Result<StateDistribution, SolverError> {
            self.distributions
                .borrow_mut()
                .pop_front()
                .ok_or(SolverError::Engine {
                    what: "no scripted distribution left".to_string(),
                })
        }

        fn transient(&self, model: &str, _steps: u32) -> Result<StateDistribution, SolverError> {
            self.steady_state(model)
        }
    }

    /// Host model with one compound element over a d_in -> d_out sub-model.
    fn compound_model() -> Model {
        let mut model = Model::new();
        model.add_element("start", 1.0, 1).unwrap();
        model.add_element("comp", 1.0, 1).unwrap();
        model.add_control_flow("start", "comp").unwrap();
        model.add_data_default("d_in").unwrap();
        model.add_data_default("d_out").unwrap();
        model.add_data_flow("start", "d_in").unwrap();
        model.add_data_flow("d_in", "comp").unwrap();
        model.add_data_flow("comp", "d_out").unwrap();
        model.set_initial_element("start").unwrap();

        model.create_sub_model("comp").unwrap();
        let sub = model.sub_model_mut("comp").unwrap();
        sub.add_element("work", 1.0, 1).unwrap();
        sub.add_data_flow("d_in", "work").unwrap();
        sub.add_data_flow("work", "d_out").unwrap();
        sub.set_initial_element("work").unwrap();
        model
    }

    /// In sub-model encoding, error=0 and ok=1.
    fn dist(ok_prob: f64, error_prob: f64) -> StateDistribution {
        StateDistribution {
            variables: vec!["d_in".into(), "d_out".into()],
            states: vec![
                (vec![1, 1], ok_prob),
                (vec![1, 0], error_prob),
            ],
        }
    }

    fn branch_probabilities(command: &str) -> Vec<f64> {
        let (_, body) = command.split_once("->").unwrap();
        body.trim_end_matches(';')
            .split('+')
            .map(|branch| branch.trim().split(':').next().unwrap().parse().unwrap())
            .collect()
    }

    #[test]
    fn compound_reduction_rewrites_element_as_leaf() {
        let mut model = compound_model();
        let solver = ScriptedSolver::new(vec![dist(0.7, 0.3), dist(0.2, 0.8)], 4.5);

        reduce(&mut model, &solver).unwrap();

        let element = model.element("comp").unwrap();
        assert!(element.sub_model.is_none());
        assert_eq!(element.repetitions, 1);
        assert_eq!(element.time, 4.5);
        assert_eq!(element.ep_commands.len(), 2);
        // deterministic combination order: declared value order of d_in
        assert!(element.ep_commands[0].starts_with("(d_in=ok) -> "));
        assert!(element.ep_commands[1].starts_with("(d_in=error) -> "));
        assert!(element.ep_commands[0].contains("(d_out'="));
    }

    #[test]
    fn short_probability_mass_is_corrected() {
        let mut model = compound_model();
        // raw masses sum to 0.997; the deficit must land on one branch
        let solver = ScriptedSolver::new(vec![dist(0.697, 0.3), dist(0.2, 0.8)], 1.0);

        reduce(&mut model, &solver).unwrap();

        let command = &model.element("comp").unwrap().ep_commands[0];
        let probs = branch_probabilities(command);
        assert_eq!(probs.len(), 2);
        let total: f64 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "sum was {total} in {command}");
    }

    #[test]
    fn empty_aggregate_is_a_hard_error() {
        let mut model = compound_model();
        let empty = StateDistribution {
            variables: vec!["d_in".into(), "d_out".into()],
            states: vec![(vec![1, 1], 0.0)],
        };
        let solver = ScriptedSolver::new(vec![empty.clone(), empty], 1.0);

        let err = reduce(&mut model, &solver).unwrap_err();
        assert!(matches!(err, ReduceError::EmptyAggregate { .. }));
        // fatal for the step: the element was not rewritten
        assert!(model.element("comp").unwrap().sub_model.is_some());
        assert!(model.element("comp").unwrap().ep_commands.is_empty());
    }

    #[test]
    fn solver_failure_leaves_element_untouched() {
        let mut model = compound_model();
        let solver = ScriptedSolver::new(Vec::new(), 1.0); // queue empty: every query fails

        let err = reduce(&mut model, &solver).unwrap_err();
        assert!(matches!(err, ReduceError::Solver(_)));
        assert!(model.element("comp").unwrap().sub_model.is_some());
    }

    #[test]
    fn repetition_reduction_multiplies_time() {
        let mut model = Model::new();
        model.add_element("retry", 2.0, 3).unwrap();
        model.add_data_default("d_in").unwrap();
        model.add_data_default("d_out").unwrap();
        model.add_data_flow("d_in", "retry").unwrap();
        model.add_data_flow("retry", "d_out").unwrap();
        model.set_initial_element("retry").unwrap();

        let solver = ScriptedSolver::new(vec![dist(0.9, 0.1), dist(0.0, 1.0)], 1.0);
        reduce(&mut model, &solver).unwrap();

        let element = model.element("retry").unwrap();
        assert_eq!(element.repetitions, 1);
        assert_eq!(element.time, 6.0);
        assert_eq!(element.ep_commands.len(), 2);
        // the all-error combination collapsed to a single certain branch
        assert!(element.ep_commands[1].starts_with("(d_in=error) -> "));
        assert_eq!(branch_probabilities(&element.ep_commands[1]), vec![1.0]);
    }

    #[test]
    fn elements_without_outputs_get_no_commands() {
        let mut model = Model::new();
        model.add_element("probe", 1.0, 4).unwrap();
        model.add_data_default("d_in").unwrap();
        model.add_data_flow("d_in", "probe").unwrap();
        model.set_initial_element("probe").unwrap();

        let solver = ScriptedSolver::new(Vec::new(), 1.0);
        reduce(&mut model, &solver).unwrap();

        let element = model.element("probe").unwrap();
        assert!(element.ep_commands.is_empty());
        assert_eq!(element.repetitions, 1);
        assert_eq!(element.time, 4.0);
    }
}
