//! Whole-model validation.
//!
//! Mirrors the mutation-time checks where the model could have been built
//! by an untrusting caller, then adds everything that needs whole-model
//! context: embedded command text, failure expressions, the initial
//! element, and sub-model boundaries.

use std::collections::BTreeSet;

use fp_core::names::NUMERIC_FUNCTIONS;
use fp_core::{Diagnostic, EntityKind, check_name};
use fp_model::{Element, Model, Value};
use tracing::debug;

use crate::lexer::ident_tokens;
use crate::report::Report;

/// Check every entity plus the model-level requirements. Findings are
/// accumulated; the pass never stops early.
pub fn check_model(model: &Model) -> Report {
    debug!(
        elements = model.elements().len(),
        data = model.data().len(),
        failures = model.failures().len(),
        "checking model"
    );
    let mut report = Report::new();

    for name in model.elements().keys() {
        report.extend(check_element(model, name));
    }
    for name in model.data().keys() {
        report.extend(check_data(model, name));
    }
    for name in model.failures().keys() {
        report.extend(check_failure(model, name));
    }

    match model.initial_element() {
        None => report.push(Diagnostic::error(
            EntityKind::Model,
            "",
            "model has no initial element",
        )),
        Some(name) if model.element(name).is_none() => report.push(Diagnostic::error(
            EntityKind::Model,
            "",
            format!("initial element \"{name}\" does not exist"),
        )),
        Some(_) => {}
    }

    report
}

/// Check a sub-model in the context of its hosting element: everything
/// [`check_model`] does, plus cross-boundary data-flow consistency: the
/// host's externally declared inputs/outputs must be covered by the
/// sub-model's aggregate internal data flow.
pub fn check_model_with_host(model: &Model, host: &Model, host_element: &str) -> Report {
    let mut report = check_model(model);

    let Some(element) = host.element(host_element) else {
        report.push(Diagnostic::error(
            EntityKind::Element,
            host_element,
            "hosting element does not exist",
        ));
        return report;
    };

    let mut internal_inputs = BTreeSet::new();
    let mut internal_outputs = BTreeSet::new();
    for sub_element in model.elements().values() {
        internal_inputs.extend(sub_element.df_inputs.iter());
        internal_outputs.extend(sub_element.df_outputs.iter());
    }

    for df_input in &element.df_inputs {
        if !internal_inputs.contains(df_input) {
            report.push(Diagnostic::error(
                EntityKind::Element,
                host_element,
                format!("data flow inconsistent with host: input \"{df_input}\" is never read inside the sub-model"),
            ));
        }
    }
    for df_output in &element.df_outputs {
        if !internal_outputs.contains(df_output) {
            report.push(Diagnostic::error(
                EntityKind::Element,
                host_element,
                format!("data flow inconsistent with host: output \"{df_output}\" is never written inside the sub-model"),
            ));
        }
    }

    report
}

/// Check a whole model tree: the top-level model, every sub-model against
/// its host, and the no-duplicate-compound-names rule along every
/// ancestor chain.
pub fn check_tree(model: &Model) -> Report {
    let mut report = check_model(model);
    check_sub_models(model, &[], &mut report);
    report
}

fn check_sub_models(model: &Model, ancestors: &[String], report: &mut Report) {
    for (name, element) in model.elements() {
        if element.sub_model.is_some() && ancestors.iter().any(|a| a == name) {
            report.push(Diagnostic::error(
                EntityKind::Element,
                name.clone(),
                "two compound elements in the same ancestor chain share this name",
            ));
        }
    }

    let mut chain: Vec<String> = ancestors.to_vec();
    chain.extend(
        model
            .elements()
            .iter()
            .filter(|(_, e)| e.sub_model.is_some())
            .map(|(n, _)| n.clone()),
    );

    for (name, element) in model.elements() {
        if let Some(sub_model) = element.sub_model.as_deref() {
            report.extend(check_model_with_host(sub_model, model, name));
            check_sub_models(sub_model, &chain, report);
        }
    }
}

/// Per-element check: name, incoming control flow, compound-element
/// warnings, and both embedded command languages.
pub fn check_element(model: &Model, name: &str) -> Report {
    let mut report = Report::new();
    let Some(element) = model.element(name) else {
        report.push(Diagnostic::error(EntityKind::Element, name, "no such element"));
        return report;
    };

    if let Err(e) = check_name(name) {
        report.push(Diagnostic::error(EntityKind::Element, name, e.to_string()));
        return report;
    }
    if model.data().contains_key(name) || model.failures().contains_key(name) {
        report.push(Diagnostic::error(
            EntityKind::Element,
            name,
            "name is not unique across elements, data, and failures",
        ));
        return report;
    }

    if model.initial_element() != Some(name) && element.cf_inputs.is_empty() {
        report.push(Diagnostic::error(
            EntityKind::Element,
            name,
            "no incoming control flow arc",
        ));
        return report;
    }

    if element.sub_model.is_some() {
        report.push(Diagnostic::warning(
            EntityKind::Element,
            name,
            "contains a sub-model that must be reduced before flat analysis",
        ));
    }
    if element.sub_model.is_some() && !element.ep_commands.is_empty() {
        // both a sub-model and manual propagation text: ambiguous authority,
        // the command text cannot be trusted against the model
        report.push(Diagnostic::warning(
            EntityKind::Element,
            name,
            "contains both a sub-model and error-propagation commands",
        ));
    } else {
        let cf_ok = check_cf_commands(model, name, element, &mut report);
        let ep_ok = check_ep_commands(model, name, element, &mut report);
        if !cf_ok || !ep_ok {
            return report;
        }
    }

    report.push(Diagnostic::info(EntityKind::Element, name, "element is OK"));
    report
}

/// Tokens exempt from membership resolution in control-flow commands.
fn cf_exempt(token: &str) -> bool {
    NUMERIC_FUNCTIONS.contains(&token) || token == "stop"
}

/// Validate manual control-flow command text.
///
/// Every command must bind the control variable to this element exactly
/// once (`cf=<self>`); later `cf` references must target declared
/// control-flow outputs; every other identifier must be a data-flow input
/// or one of its legal values. Across all commands, every declared output
/// must be mentioned at least once.
fn check_cf_commands(
    model: &Model,
    name: &str,
    element: &Element,
    report: &mut Report,
) -> bool {
    if element.cf_commands.is_empty() {
        return true;
    }

    let input_value_token = |token: &str| {
        element.df_inputs.iter().any(|df_input| {
            model
                .data_slot(df_input)
                .is_some_and(|d| d.values.iter().any(|v| v.matches_token(token)))
        })
    };

    let mut outputs_covered = vec![false; element.cf_outputs.len()];

    for command in &element.cf_commands {
        let idents: Vec<String> = ident_tokens(command)
            .into_iter()
            .filter(|t| !cf_exempt(t))
            .collect();
        let mut resolved = vec![false; idents.len()];
        let mut self_found = false;

        for k in 0..idents.len() {
            if idents[k] == "cf" && !self_found {
                self_found = true;
                resolved[k] = true;
                if idents.get(k + 1).map(String::as_str) == Some(name) {
                    resolved[k + 1] = true;
                } else {
                    report.push(Diagnostic::error(
                        EntityKind::Element,
                        name,
                        format!("control-flow command \"{command}\" does not bind cf to this element"),
                    ));
                    return false;
                }
            } else if idents[k] == "cf" {
                resolved[k] = true;
                if let Some(next) = idents.get(k + 1)
                    && let Some(pos) = element.cf_outputs.iter().position(|o| o == next)
                {
                    outputs_covered[pos] = true;
                    resolved[k + 1] = true;
                }
            } else if element.df_inputs.iter().any(|d| d == &idents[k]) {
                resolved[k] = true;
            }
            if input_value_token(&idents[k]) {
                resolved[k] = true;
            }
        }

        if !self_found {
            report.push(Diagnostic::error(
                EntityKind::Element,
                name,
                format!("control-flow command \"{command}\" has no cf self-reference"),
            ));
            return false;
        }
        if let Some(k) = resolved.iter().position(|r| !r) {
            report.push(Diagnostic::error(
                EntityKind::Element,
                name,
                format!(
                    "unresolved token \"{}\" in control-flow command \"{command}\"",
                    idents[k]
                ),
            ));
            return false;
        }
    }

    for (output, covered) in element.cf_outputs.iter().zip(&outputs_covered) {
        if !*covered {
            report.push(Diagnostic::error(
                EntityKind::Element,
                name,
                format!("control-flow output \"{output}\" is never mentioned in the commands"),
            ));
            return false;
        }
    }

    true
}

/// Validate manual error-propagation command text.
///
/// Each command is split at the guard/update separator `->`. Guard
/// identifiers must resolve to data-flow inputs or their values; update
/// identifiers to data-flow inputs/outputs or their values. `true` and
/// the numeric functions are always legal; numbers never reach this check.
fn check_ep_commands(
    model: &Model,
    name: &str,
    element: &Element,
    report: &mut Report,
) -> bool {
    let value_of = |slots: &[&String], token: &str| {
        slots.iter().any(|slot| {
            model
                .data_slot(slot.as_str())
                .is_some_and(|d| d.values.iter().any(|v| v.matches_token(token)))
        })
    };

    let inputs: Vec<&String> = element.df_inputs.iter().collect();
    let in_outs: Vec<&String> = {
        let mut set: BTreeSet<&String> = element.df_inputs.iter().collect();
        set.extend(element.df_outputs.iter());
        set.into_iter().collect()
    };

    let mut ok = true;
    for command in &element.ep_commands {
        let Some((left, right)) = command.split_once("->") else {
            report.push(Diagnostic::error(
                EntityKind::Element,
                name,
                format!("error-propagation command \"{command}\" has no \"->\" separator"),
            ));
            ok = false;
            continue;
        };

        for token in ident_tokens(left) {
            let resolves = NUMERIC_FUNCTIONS.contains(&token.as_str())
                || token == "true"
                || inputs.iter().any(|d| **d == token)
                || value_of(&inputs, &token);
            if !resolves {
                report.push(Diagnostic::error(
                    EntityKind::Element,
                    name,
                    format!("unresolved token \"{token}\" in guard of \"{command}\""),
                ));
                ok = false;
            }
        }
        for token in ident_tokens(right) {
            let resolves = NUMERIC_FUNCTIONS.contains(&token.as_str())
                || token == "true"
                || in_outs.iter().any(|d| **d == token)
                || value_of(&in_outs, &token);
            if !resolves {
                report.push(Diagnostic::error(
                    EntityKind::Element,
                    name,
                    format!("unresolved token \"{token}\" in update of \"{command}\""),
                ));
                ok = false;
            }
        }
    }

    ok
}

/// Per-data check: name, value-set correctness, initial-value membership,
/// plus the soft state-space warnings.
pub fn check_data(model: &Model, name: &str) -> Report {
    let mut report = Report::new();
    let Some(data) = model.data_slot(name) else {
        report.push(Diagnostic::error(EntityKind::Data, name, "no such data"));
        return report;
    };

    if let Err(e) = check_name(name) {
        report.push(Diagnostic::error(EntityKind::Data, name, e.to_string()));
        return report;
    }
    if model.elements().contains_key(name) || model.failures().contains_key(name) {
        report.push(Diagnostic::error(
            EntityKind::Data,
            name,
            "name is not unique across elements, data, and failures",
        ));
        return report;
    }

    let mut ok = true;
    let mut seen = BTreeSet::new();
    for value in &data.values {
        if !seen.insert(value) {
            report.push(Diagnostic::error(
                EntityKind::Data,
                name,
                format!("duplicate value \"{value}\" in value set"),
            ));
            ok = false;
        }
        match value {
            Value::Int(i) if *i > 1000 => {
                report.push(Diagnostic::warning(
                    EntityKind::Data,
                    name,
                    format!("int value {i} is larger than 1000, check the solver variable range"),
                ));
            }
            Value::Int(_) => {}
            Value::Name(token) => {
                if let Err(e) = check_name(token) {
                    report.push(Diagnostic::error(
                        EntityKind::Data,
                        name,
                        format!("bad value \"{token}\": {e}"),
                    ));
                    ok = false;
                } else if model.existing_kind(token).is_some() {
                    report.push(Diagnostic::error(
                        EntityKind::Data,
                        name,
                        format!("value \"{token}\" collides with another entity's name"),
                    ));
                    ok = false;
                }
            }
        }
    }
    if !data.values.contains(&data.initial_value) {
        report.push(Diagnostic::error(
            EntityKind::Data,
            name,
            format!(
                "initial value \"{}\" is not in the value set",
                data.initial_value
            ),
        ));
        ok = false;
    }
    if data.values.len() > 10 {
        report.push(Diagnostic::warning(
            EntityKind::Data,
            name,
            format!(
                "{} possible values, think about state-space growth",
                data.values.len()
            ),
        ));
    }

    if ok {
        report.push(Diagnostic::info(EntityKind::Data, name, "data is OK"));
    }
    report
}

/// Per-failure check: every identifier token of the expression must
/// resolve to a data name, a data value, an element name, or a reserved
/// keyword; numeric literals never reach this check.
pub fn check_failure(model: &Model, name: &str) -> Report {
    let mut report = Report::new();
    let Some(expression) = model.failure(name) else {
        report.push(Diagnostic::error(EntityKind::Failure, name, "no such failure"));
        return report;
    };

    let keyword = |token: &str| {
        NUMERIC_FUNCTIONS.contains(&token) || token == "true" || token == "cf"
    };
    let data_value = |token: &str| {
        model
            .data()
            .values()
            .any(|d| d.values.iter().any(|v| v.matches_token(token)))
    };

    let mut ok = true;
    for token in ident_tokens(expression) {
        let resolves = keyword(&token)
            || model.data().contains_key(&token)
            || model.elements().contains_key(&token)
            || data_value(&token);
        if !resolves {
            report.push(Diagnostic::error(
                EntityKind::Failure,
                name,
                format!("unresolved token \"{token}\" in expression \"{expression}\""),
            ));
            ok = false;
        }
    }

    if ok {
        report.push(Diagnostic::info(EntityKind::Failure, name, "failure is OK"));
    }
    report
}
