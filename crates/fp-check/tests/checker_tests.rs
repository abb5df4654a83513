//! Integration tests for whole-model validation.

use fp_check::{check_model, check_tree};
use fp_core::{EntityKind, Severity};
use fp_model::Model;

/// reader -> process -> writer pipeline over one data slot.
fn pipeline() -> Model {
    let mut model = Model::new();
    model.add_element("reader", 1.0, 1).unwrap();
    model.add_element("process", 2.0, 1).unwrap();
    model.add_element("writer", 1.0, 1).unwrap();
    model.add_control_flow("reader", "process").unwrap();
    model.add_control_flow("process", "writer").unwrap();
    model.add_data_default("d_raw").unwrap();
    model.add_data_default("d_cooked").unwrap();
    model.add_data_flow("reader", "d_raw").unwrap();
    model.add_data_flow("d_raw", "process").unwrap();
    model.add_data_flow("process", "d_cooked").unwrap();
    model.add_data_flow("d_cooked", "writer").unwrap();
    model.set_initial_element("reader").unwrap();
    model
}

#[test]
fn clean_pipeline_passes() {
    let report = check_model(&pipeline());
    assert!(report.is_ok(), "diagnostics: {:?}", report.diagnostics());
    assert_eq!(
        report.entity_status(EntityKind::Element, "process"),
        Some(Severity::Info)
    );
}

#[test]
fn missing_initial_element_is_model_level_error() {
    let mut model = pipeline();
    model.remove_element("reader").unwrap();
    // "process" lost its incoming arc too; both findings must show up
    let report = check_model(&model);
    assert!(!report.is_ok());
    let messages: Vec<String> = report.errors().map(|d| d.to_string()).collect();
    assert!(
        messages.iter().any(|m| m.contains("no initial element")),
        "{messages:?}"
    );
    assert!(
        messages.iter().any(|m| m.contains("no incoming control flow")),
        "{messages:?}"
    );
}

#[test]
fn all_entities_checked_even_after_failures() {
    let mut model = pipeline();
    model.remove_control_flow("reader", "process").unwrap();
    model.add_failure("f", "nonsense_token").unwrap();
    let report = check_model(&model);
    // one element error and one failure error, in a single pass
    assert_eq!(
        report.entity_status(EntityKind::Element, "process"),
        Some(Severity::Error)
    );
    assert_eq!(
        report.entity_status(EntityKind::Failure, "f"),
        Some(Severity::Error)
    );
}

#[test]
fn failure_expression_resolution() {
    let mut model = pipeline();
    model.add_failure("data_bad", "d_cooked=error").unwrap();
    model
        .add_failure("late", "cf=writer & d_raw!=ok")
        .unwrap();
    assert!(check_model(&model).is_ok());

    model.add_failure("broken", "d_cooked=explosion").unwrap();
    let report = check_model(&model);
    assert_eq!(
        report.entity_status(EntityKind::Failure, "broken"),
        Some(Severity::Error)
    );
    // the other failures are still fine
    assert_eq!(
        report.entity_status(EntityKind::Failure, "late"),
        Some(Severity::Info)
    );
}

#[test]
fn cf_commands_must_bind_self_and_cover_outputs() {
    let mut model = pipeline();

    // good: binds cf to the element, mentions the only output
    model
        .set_cf_commands(
            "process",
            vec!["cf=process -> 1:(cf'=writer);".to_string()],
        )
        .unwrap();
    assert!(check_model(&model).is_ok());

    // wrong self-reference
    model
        .set_cf_commands(
            "process",
            vec!["cf=reader -> 1:(cf'=writer);".to_string()],
        )
        .unwrap();
    assert!(!check_model(&model).is_ok());

    // output never mentioned
    model
        .set_cf_commands("process", vec!["cf=process -> 1:(cf'=stop);".to_string()])
        .unwrap();
    assert!(!check_model(&model).is_ok());
}

#[test]
fn cf_command_guard_values_must_come_from_input_domains() {
    let mut model = pipeline();
    model
        .set_cf_commands(
            "process",
            vec![
                "cf=process & d_raw=ok -> 1:(cf'=writer);".to_string(),
                "cf=process & d_raw=error -> 1:(cf'=writer);".to_string(),
            ],
        )
        .unwrap();
    assert!(check_model(&model).is_ok());

    model
        .set_cf_commands(
            "process",
            vec!["cf=process & d_raw=meltdown -> 1:(cf'=writer);".to_string()],
        )
        .unwrap();
    assert!(!check_model(&model).is_ok());
}

#[test]
fn ep_commands_resolve_against_inputs_and_outputs() {
    let mut model = pipeline();
    model
        .set_ep_commands(
            "process",
            vec![
                "(d_raw=ok) -> 1:(d_cooked'=ok);".to_string(),
                "(d_raw!=ok) -> 0.9:(d_cooked'=error) + 0.1:(d_cooked'=ok);".to_string(),
            ],
        )
        .unwrap();
    assert!(check_model(&model).is_ok());

    // guard may not mention an output slot
    model
        .set_ep_commands(
            "process",
            vec!["(d_cooked=ok) -> 1:(d_cooked'=ok);".to_string()],
        )
        .unwrap();
    assert!(!check_model(&model).is_ok());

    // missing separator is reported, not a crash
    model
        .set_ep_commands("process", vec!["(d_raw=ok) 1:(d_cooked'=ok);".to_string()])
        .unwrap();
    assert!(!check_model(&model).is_ok());
}

#[test]
fn sub_model_warnings_and_dual_authority() {
    let mut model = pipeline();
    model.create_sub_model("process").unwrap();
    let report = check_model(&model);
    assert!(report.is_ok());
    assert_eq!(
        report.entity_status(EntityKind::Element, "process"),
        Some(Severity::Warning)
    );

    // manual ep text next to a sub-model: second warning, checks skipped
    model
        .set_ep_commands("process", vec!["garbage with no separator".to_string()])
        .unwrap();
    let report = check_model(&model);
    assert!(report.is_ok(), "expression checks must be skipped");
    let warnings: Vec<String> = report
        .diagnostics()
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .map(|d| d.message.clone())
        .collect();
    assert!(warnings.iter().any(|m| m.contains("both a sub-model")));
}

#[test]
fn tree_check_flags_boundary_mismatch() {
    let mut model = pipeline();
    model.create_sub_model("process").unwrap();
    {
        let sub = model.sub_model_mut("process").unwrap();
        // inner model reads d_raw but never writes d_cooked
        sub.add_element("inner", 1.0, 1).unwrap();
        sub.add_data_flow("d_raw", "inner").unwrap();
        sub.set_initial_element("inner").unwrap();
    }
    let report = check_tree(&model);
    assert!(!report.is_ok());
    assert!(
        report
            .errors()
            .any(|d| d.message.contains("never written inside the sub-model")),
        "{:?}",
        report.diagnostics()
    );
}

#[test]
fn tree_check_flags_duplicate_compound_names() {
    let mut model = pipeline();
    model.create_sub_model("process").unwrap();
    {
        let sub = model.sub_model_mut("process").unwrap();
        sub.add_element("inner", 1.0, 1).unwrap();
        // a nested compound element reusing the ancestor's name
        sub.add_element("process", 1.0, 1).unwrap();
        sub.add_control_flow("inner", "process").unwrap();
        sub.create_sub_model("process").unwrap();
        sub.add_data_flow("d_raw", "inner").unwrap();
        sub.add_data_flow("inner", "d_cooked").unwrap();
        sub.set_initial_element("inner").unwrap();
    }
    let report = check_tree(&model);
    assert!(
        report
            .errors()
            .any(|d| d.message.contains("share this name")),
        "{:?}",
        report.diagnostics()
    );
}
