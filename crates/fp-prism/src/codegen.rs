//! Flat solver-text emission.
//!
//! Translates a (flat) model into the dtmc dialect of the external model
//! checker: integer constants for elements and string values, a control
//! flow module, an error propagation module, optional reward structures
//! and failure formulas.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use fp_model::{Model, Value};
use tracing::warn;

use crate::encode::ValueEncoding;
use crate::error::EmitError;

/// What to include in the emitted model.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions<'a> {
    /// Skip the error propagation module (control flow only).
    pub skip_ep_module: bool,
    /// Emit the `"time"` reward structure.
    pub time_reward: bool,
    /// Override the initial value of selected data slots, used during
    /// reduction to pin one input combination.
    pub init_values: Option<&'a BTreeMap<String, Value>>,
}

fn emit_element_consts(model: &Model, out: &mut String) {
    out.push_str("// element codes\n");
    let mut has_final = false;
    for (i, (name, element)) in model.elements().iter().enumerate() {
        let _ = writeln!(out, "const int {name}={i};");
        if element.cf_outputs.is_empty() {
            has_final = true;
        }
    }
    if has_final {
        let _ = writeln!(out, "const int stop={};", model.elements().len());
    }
}

fn emit_value_consts(encoding: &ValueEncoding, out: &mut String) {
    out.push_str("// data value codes\n");
    for (code, name) in encoding.iter() {
        let _ = writeln!(out, "const int {name}={code};");
    }
}

/// Synthesize the default control-flow command for one element: a uniform
/// branch over its control-flow outputs, or a terminal transition to
/// `stop` if it has none.
pub fn default_cf_command(model: &Model, el_name: &str) -> Result<String, EmitError> {
    let element = model.element(el_name).ok_or_else(|| EmitError::MissingElement {
        name: el_name.to_string(),
    })?;
    let mut command = format!("cf={el_name} -> ");
    if element.cf_outputs.is_empty() {
        command.push_str("(cf'=stop);");
    } else {
        let p = 1.0 / element.cf_outputs.len() as f64;
        let branches: Vec<String> = element
            .cf_outputs
            .iter()
            .map(|output| format!("{p}:(cf'={output})"))
            .collect();
        command.push_str(&branches.join(" + "));
        command.push(';');
    }
    Ok(command)
}

/// Synthesize the default error-propagation commands for one element.
///
/// No data-flow inputs: all outputs are unconditionally set to their
/// initial ("healthy") value. With inputs, two alternatives: all inputs
/// healthy keeps all outputs healthy, any deviant input drives every
/// output to the first value distinct from its initial one.
pub fn default_ep_commands(model: &Model, el_name: &str) -> Result<Vec<String>, EmitError> {
    let element = model.element(el_name).ok_or_else(|| EmitError::MissingElement {
        name: el_name.to_string(),
    })?;
    let data_of = |d_name: &str| {
        model.data_slot(d_name).ok_or_else(|| EmitError::MissingData {
            name: el_name.to_string(),
            data: d_name.to_string(),
        })
    };

    if element.df_outputs.is_empty() {
        return Ok(Vec::new());
    }

    let mut healthy_updates = Vec::new();
    for output in &element.df_outputs {
        let data = data_of(output)?;
        healthy_updates.push(format!("({output}'={})", data.initial_value));
    }

    if element.df_inputs.is_empty() {
        return Ok(vec![format!("(true) -> 1:{};", healthy_updates.join(" & "))]);
    }

    let mut healthy_guards = Vec::new();
    let mut deviant_guards = Vec::new();
    for input in &element.df_inputs {
        let data = data_of(input)?;
        healthy_guards.push(format!("({input}={})", data.initial_value));
        deviant_guards.push(format!("({input}!={})", data.initial_value));
    }

    let mut failed_updates = Vec::new();
    for output in &element.df_outputs {
        let data = data_of(output)?;
        failed_updates.push(format!("({output}'={})", data.first_non_initial_value()));
    }

    Ok(vec![
        format!(
            "{} -> {};",
            healthy_guards.join(" & "),
            healthy_updates.join(" & ")
        ),
        format!(
            "{} -> {};",
            deviant_guards.join(" | "),
            failed_updates.join(" & ")
        ),
    ])
}

fn emit_cf_module(model: &Model, out: &mut String) -> Result<(), EmitError> {
    let initial = model.initial_element().ok_or(EmitError::NoInitialElement)?;
    out.push_str("// control flow commands\n");
    out.push_str("module control_flow\n");
    let _ = writeln!(out, "\tcf:[0..{}] init {initial};", model.elements().len());
    for (name, element) in model.elements() {
        let _ = write!(out, "\t// element {name}");
        if !element.df_inputs.is_empty() {
            let _ = write!(out, ", df inputs {:?}", element.df_inputs);
        }
        let _ = writeln!(out, ", cf transitions {:?}", element.cf_outputs);
        if element.cf_commands.is_empty() {
            let _ = writeln!(out, "\t[{name}] {}", default_cf_command(model, name)?);
        } else {
            for command in &element.cf_commands {
                let _ = writeln!(out, "\t[{name}] {command}");
            }
        }
    }
    out.push_str("endmodule\n");
    Ok(())
}

fn emit_ep_variables(
    model: &Model,
    encoding: &ValueEncoding,
    init_values: Option<&BTreeMap<String, Value>>,
    restrict: Option<&BTreeSet<String>>,
    out: &mut String,
) {
    for (d_name, data) in model.data() {
        if let Some(keep) = restrict
            && !keep.contains(d_name)
        {
            continue;
        }
        let init = init_values
            .and_then(|m| m.get(d_name))
            .unwrap_or(&data.initial_value);
        let _ = writeln!(
            out,
            "\t{d_name} : [0 .. {}] init {init};",
            encoding.max_encoded()
        );
    }
}

fn emit_ep_module(
    model: &Model,
    encoding: &ValueEncoding,
    init_values: Option<&BTreeMap<String, Value>>,
    out: &mut String,
) -> Result<(), EmitError> {
    out.push_str("// error propagation commands\n");
    out.push_str("module error_propagation\n");
    emit_ep_variables(model, encoding, init_values, None, out);
    for (name, element) in model.elements() {
        if element.sub_model.is_some() {
            warn!(element = %name, "sub-model ignored in the flat model; reduce first");
        }
        if element.repetitions > 1 {
            warn!(element = %name, "repetitions ignored in the flat model; reduce first");
        }
        if element.df_outputs.is_empty() {
            continue;
        }
        let _ = write!(out, "\t// element {name}");
        if !element.df_inputs.is_empty() {
            let _ = write!(out, ", df inputs {:?}", element.df_inputs);
        }
        let _ = writeln!(out, ", df outputs {:?}", element.df_outputs);
        if element.ep_commands.is_empty() {
            for command in default_ep_commands(model, name)? {
                let _ = writeln!(out, "\t[{name}] {command}");
            }
        } else {
            for command in &element.ep_commands {
                let _ = writeln!(out, "\t[{name}] {command}");
            }
        }
    }
    out.push_str("endmodule\n");
    Ok(())
}

fn emit_time_reward(model: &Model, out: &mut String) {
    out.push_str("// time reward\n");
    out.push_str("rewards \"time\"\n");
    for (name, element) in model.elements() {
        let _ = writeln!(out, "\tcf={name}:{};", element.time);
    }
    out.push_str("endrewards\n");
}

/// One `formula` line per failure expression.
pub fn emit_failure_formulas(model: &Model) -> String {
    let mut out = String::from("// failure formulas\n");
    for (name, expression) in model.failures() {
        let _ = writeln!(out, "formula {name} = {expression};");
    }
    out
}

/// Emit the full flat model.
pub fn emit_model(model: &Model, options: &EmitOptions) -> Result<String, EmitError> {
    let mut out = String::from("// generated by failprop\ndtmc\n");
    emit_element_consts(model, &mut out);
    let encoding = ValueEncoding::from_model(model);
    if !options.skip_ep_module {
        emit_value_consts(&encoding, &mut out);
    }
    emit_cf_module(model, &mut out)?;
    if !options.skip_ep_module {
        emit_ep_module(model, &encoding, options.init_values, &mut out)?;
    }
    if options.time_reward {
        emit_time_reward(model, &mut out);
    }
    Ok(out)
}

/// Emit the error-propagation-only model used to reduce a repeated
/// element: just the element's own data slots and commands, with the
/// given input combination pinned as initial values. The command carries
/// no synchronization label, so each solver step is one execution.
pub fn emit_repetition_model(
    model: &Model,
    el_name: &str,
    init_values: &BTreeMap<String, Value>,
) -> Result<String, EmitError> {
    let element = model.element(el_name).ok_or_else(|| EmitError::MissingElement {
        name: el_name.to_string(),
    })?;
    let encoding = ValueEncoding::from_model(model);

    let mut out = String::from("// generated by failprop\ndtmc\n");
    emit_value_consts(&encoding, &mut out);
    out.push_str("// error propagation commands\n");
    out.push_str("module error_propagation\n");

    let scope: BTreeSet<String> = element
        .df_inputs
        .iter()
        .chain(element.df_outputs.iter())
        .cloned()
        .collect();
    emit_ep_variables(model, &encoding, Some(init_values), Some(&scope), &mut out);

    if !element.df_outputs.is_empty() {
        if element.ep_commands.is_empty() {
            for command in default_ep_commands(model, el_name)? {
                let _ = writeln!(out, "\t[] {command}");
            }
        } else {
            for command in &element.ep_commands {
                let _ = writeln!(out, "\t[] {command}");
            }
        }
    }
    out.push_str("endmodule\n");
    Ok(out)
}
