//! End-to-end pipeline behaviour with a scripted oracle.

mod common;

use common::ScriptedOracle;
use versemark::validate::StructuralWarning;
use versemark::verses::{segment, FALLBACK_EXPLANATION};
use versemark::{Numbering, OracleError, Pipeline, PipelineError};

const PSALM: &str = "private let text = [\n    \"Dixit Dominus Domino meo:\",\n    \"Sede a dextris meis,\",\n    \"donec ponam inimicos tuos\",\n    \"scabellum pedum tuorum.\"\n]";

#[test]
fn annotate_unmarked_array_counts_every_element() {
    let reply = "Corrected code:\n```swift\nprivate let text = [\n    /* 1 */ \"Dixit Dominus Domino meo:\",\n    /* 2 */ \"Sede a dextris meis,\",\n    /* 3 */ \"donec ponam inimicos tuos\",\n    /* 4 */ \"scabellum pedum tuorum.\"\n]\n```<|im_end|>";
    let pipeline = Pipeline::new(ScriptedOracle::replying(&[reply]), "deepseek-coder:6.7b");
    let outcome = pipeline.annotate(PSALM, None).unwrap();

    assert_eq!(outcome.elements_count, Numbering::Sequential(4));
    assert_eq!(outcome.element_total, 4);
    assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    assert!(outcome.corrected_code.starts_with("private let text = ["));
    assert!(!outcome.corrected_code.contains("```"));
    assert!(!outcome.corrected_code.contains("<|"));
    assert_eq!(outcome.language, "swift");
    assert_eq!(outcome.model_used, "deepseek-coder:6.7b");

    let prompts = pipeline.oracle().prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(PSALM));
}

#[test]
fn annotate_restores_dropped_assignment_and_moves_trailing_markers() {
    let reply = "[\n    \"Dixit Dominus Domino meo:\" /* 1 */,\n    \"Sede a dextris meis,\" /* 2 */,\n    \"donec ponam inimicos tuos\" /* 3 */,\n    \"scabellum pedum tuorum.\" /* 4 */\n]";
    let pipeline = Pipeline::new(ScriptedOracle::replying(&[reply]), "m");
    let outcome = pipeline.annotate(PSALM, None).unwrap();

    assert!(outcome.corrected_code.starts_with("private let text = [\n"));
    assert!(outcome
        .corrected_code
        .contains("/* 3 */ \"donec ponam inimicos tuos\","));
    assert_eq!(outcome.elements_count, Numbering::Sequential(4));
}

#[test]
fn annotate_reports_non_sequential_numbering_without_fixing_it() {
    let reply = "private let text = [\n    /* 1 */ \"Dixit Dominus Domino meo:\",\n    /* 3 */ \"Sede a dextris meis,\",\n    /* 2 */ \"donec ponam inimicos tuos\",\n    /* 4 */ \"scabellum pedum tuorum.\"\n]";
    let pipeline = Pipeline::new(ScriptedOracle::replying(&[reply]), "m");
    let outcome = pipeline.annotate(PSALM, None).unwrap();

    assert_eq!(
        outcome.elements_count,
        Numbering::NonSequential {
            count: 4,
            sequence: vec![1, 3, 2, 4]
        }
    );
    assert!(outcome.corrected_code.contains("/* 3 */ \"Sede"));
}

#[test]
fn annotate_flags_dropped_element() {
    let reply = "private let text = [\n    /* 1 */ \"Dixit Dominus Domino meo:\",\n    \"Sede a dextris meis,\",\n    /* 2 */ \"donec ponam inimicos tuos\",\n    /* 3 */ \"scabellum pedum tuorum.\"\n]";
    let pipeline = Pipeline::new(ScriptedOracle::replying(&[reply]), "m");
    let outcome = pipeline.annotate(PSALM, None).unwrap();

    assert_eq!(outcome.elements_count, Numbering::Sequential(3));
    assert_eq!(
        outcome.warnings,
        vec![StructuralWarning::MarkerCountMismatch {
            markers: 3,
            elements: 4
        }]
    );
}

#[test]
fn truncated_reply_is_incomplete() {
    let pipeline = Pipeline::new(ScriptedOracle::replying(&["[\n/* 1 */ \"Dixit\""]), "m");
    let err = pipeline.annotate(PSALM, None).unwrap_err();
    assert!(matches!(err, PipelineError::Incomplete { .. }), "{err}");
}

#[test]
fn oracle_failure_is_reported_as_unavailable() {
    let oracle = ScriptedOracle::new(vec![Err(OracleError::ConnectionRefused(
        "http://localhost:11434".to_string(),
    ))]);
    let err = Pipeline::new(oracle, "m").annotate(PSALM, None).unwrap_err();
    assert!(err.to_string().starts_with("oracle unavailable:"));
}

#[test]
fn strip_finishes_what_the_oracle_missed() {
    let code = "```swift\nlet a = [\n    /* 1 */ \"http://example.org\", // site\n    /* 2 */ \"b\"\n]\n```";
    let reply = "```\nlet a = [\n    \"http://example.org\", // site\n    \"b\"\n]\n```";
    let pipeline = Pipeline::new(ScriptedOracle::replying(&[reply]), "m");
    let outcome = pipeline.strip_comments(code, None, true).unwrap();

    assert_eq!(
        outcome.stripped_code,
        "```swift\nlet a = [\n    \"http://example.org\",\n    \"b\"\n]\n```"
    );
    assert!(outcome.oracle_used);
    assert_eq!(outcome.model_used.as_deref(), Some("m"));
}

#[test]
fn untagged_fence_is_rewrapped_as_swift() {
    let pipeline = Pipeline::new(ScriptedOracle::replying(&[]), "m");
    let outcome = pipeline
        .strip_comments("```\n[\"a\"] // x\n```", None, false)
        .unwrap();
    assert_eq!(outcome.stripped_code, "```swift\n[\"a\"]\n```");
    assert!(pipeline.oracle().prompts().is_empty());
}

#[test]
fn verse_adjustment_uses_the_oracle_grouping() {
    let analysis = r#"{"verse_boundaries": [
        {"verse_number": 1, "content": "Dixit Dominus Domino meo: Sede a dextris meis,", "array_lines": [0, 1]},
        {"verse_number": 2, "content": "donec ponam inimicos tuos scabellum pedum tuorum.", "array_lines": [2, 3]}
    ], "total_complete_verses": 2, "notes": "two verses"}"#;
    let restructuring = r#"Sure! {"new_verses": [
        {"verse_number": 1, "content": "Dixit Dominus Domino meo: Sede a dextris meis,", "source_lines": [0, 1]},
        {"verse_number": 2, "content": "donec ponam inimicos tuos scabellum pedum tuorum.", "source_lines": [2, 3]}
    ], "explanation": "merged half-verses"}"#;
    let pipeline = Pipeline::new(ScriptedOracle::replying(&[analysis, restructuring]), "m");
    let outcome = pipeline.adjust_verses(PSALM, 2).unwrap();

    assert_eq!(outcome.original_count, 4);
    assert_eq!(outcome.achieved_count, 2);
    assert!(!outcome.analysis.fallback);
    assert!(!outcome.restructuring.fallback);
    assert!(outcome.text_preserved);
    assert_eq!(
        outcome.code_fragment,
        "private let text = [\n    /* 1 */ \"Dixit Dominus Domino meo: Sede a dextris meis,\",\n    /* 2 */ \"donec ponam inimicos tuos scabellum pedum tuorum.\"\n]"
    );
    let prompts = pipeline.oracle().prompts();
    assert!(prompts[1].contains("into exactly 2 verses"));
}

#[test]
fn verse_adjustment_falls_back_to_original_structure() {
    let pipeline = Pipeline::new(
        ScriptedOracle::replying(&["not json at all", "still not json"]),
        "m",
    );
    let outcome = pipeline.adjust_verses(PSALM, 2).unwrap();

    assert!(outcome.analysis.fallback);
    assert!(outcome.restructuring.fallback);
    assert_eq!(outcome.restructuring.explanation, FALLBACK_EXPLANATION);
    assert_eq!(outcome.achieved_count, 4);
    assert!(outcome.text_preserved);
    let contents: Vec<String> = segment(&outcome.code_fragment)
        .into_iter()
        .map(|element| element.content)
        .collect();
    assert_eq!(
        contents,
        vec![
            "Dixit Dominus Domino meo:",
            "Sede a dextris meis,",
            "donec ponam inimicos tuos",
            "scabellum pedum tuorum."
        ]
    );
}

#[test]
fn altered_text_is_reported_not_rejected() {
    let restructuring = r#"{"new_verses": [{"verse_number": 1, "content": "Dixit Dominus", "source_lines": [0]}]}"#;
    let pipeline = Pipeline::new(
        ScriptedOracle::new(vec![
            Err(OracleError::Timeout(std::time::Duration::from_secs(45))),
            Ok(restructuring.to_string()),
        ]),
        "m",
    );
    let outcome = pipeline.adjust_verses(PSALM, 1).unwrap();
    assert!(outcome.analysis.fallback);
    assert!(!outcome.restructuring.fallback);
    assert!(!outcome.text_preserved);
    assert_eq!(outcome.achieved_count, 1);
}
