use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::{TempDir, tempdir};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_lenderbot")
}

fn write_file(path: &Path, content: &str) {
    fs::write(path, content).expect("failed to write test file");
}

const LISTING: &str = r#"{
    "asOfDate": "2026-01-01T06:00:00.000-08:00",
    "loans": [
        {"id": 101, "grade": "C", "subGrade": "C2", "term": 36, "intRate": 14.2, "loanAmount": 10000, "purpose": "credit_card", "installment": 342.1},
        {"id": 102, "grade": "C", "subGrade": "C5", "term": 60, "intRate": 16.9, "loanAmount": 20000, "purpose": "debt_consolidation", "installment": 496.3},
        {"id": 103, "grade": "D", "subGrade": "D1", "term": 36, "intRate": 18.0, "loanAmount": 5000, "purpose": "car", "installment": 180.7},
        {"id": 104, "grade": "C", "subGrade": "C1", "term": 36, "intRate": 13.5, "loanAmount": 8000, "purpose": "house", "installment": 271.4}
    ]
}"#;

fn setup(filters: &str) -> TempDir {
    let dir = tempdir().expect("temp dir");
    write_file(&dir.path().join("filters.json"), filters);
    write_file(&dir.path().join("loans.json"), LISTING);
    dir
}

fn run(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(bin())
        .arg("-c")
        .arg(dir.path())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("command should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_select_json_outputs_surviving_loans() {
    let dir = setup(
        r#"{
            "basic": [{"filter": "{grade} == C"}],
            "exclusions": [{"filter": "{term} > 36"}]
        }"#,
    );
    let loans = dir.path().join("loans.json");
    let output = run(&dir, &["select", "--loans", loans.to_str().expect("utf8 path"), "--json"]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let selected: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout should be JSON");
    let ids: Vec<i64> = selected
        .as_array()
        .expect("array of loans")
        .iter()
        .map(|loan| loan["id"].as_f64().expect("numeric id") as i64)
        .collect();
    assert_eq!(ids, vec![101, 104]);
}

#[test]
fn test_select_skips_owned_notes_in_parallel_mode() {
    let dir = setup(r#"{"basic": ["{grade} == C"]}"#);
    let loans = dir.path().join("loans.json");
    let owned = dir.path().join("owned.json");
    write_file(&owned, r#"{"myNotes": [{"loanId": 101}]}"#);

    let output = run(
        &dir,
        &[
            "select",
            "--loans",
            loans.to_str().expect("utf8 path"),
            "--owned",
            owned.to_str().expect("utf8 path"),
            "--parallel",
            "--json",
        ],
    );

    assert!(output.status.success());
    let selected: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout should be JSON");
    assert_eq!(selected.as_array().map(Vec::len), Some(2));
}

#[test]
fn test_self_test_flags_typo_and_exits_nonzero() {
    let dir = setup(
        r#"{
            "basic": ["{grade} == C", "{grdae} == C"],
            "exclusions": ["{term} >"]
        }"#,
    );
    let loans = dir.path().join("loans.json");
    let output = run(&dir, &["test-filters", "--loans", loans.to_str().expect("utf8 path")]);

    assert_eq!(output.status.code(), Some(2));
    let text = stdout(&output);
    assert!(text.contains("{grdae} == C"), "stdout: {text}");
    assert!(text.contains("REJECTS ALL"), "stdout: {text}");
    assert!(text.contains("INVALID"), "stdout: {text}");
}

#[test]
fn test_self_test_passes_with_sane_filters() {
    let dir = setup(r#"{"basic": ["{intRate} > 10"], "exclusions": ["{grade} == G"]}"#);
    let loans = dir.path().join("loans.json");
    let output = run(&dir, &["test-filters", "--loans", loans.to_str().expect("utf8 path")]);

    assert!(
        output.status.success(),
        "stdout: {}",
        stdout(&output)
    );
}

#[test]
fn test_check_evaluates_inline_loan() {
    let dir = tempdir().expect("temp dir");
    let output = run(
        &dir,
        &[
            "check",
            "{intRate} > 10 and {term} <= 36",
            "--loan",
            r#"{"intRate": 15.5, "term": 36}"#,
        ],
    );

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Fields:  intRate, term"), "stdout: {text}");
    assert!(text.contains("Result:  PASS"), "stdout: {text}");
}

#[test]
fn test_check_rejects_malformed_expression() {
    let dir = tempdir().expect("temp dir");
    let output = run(&dir, &["check", "({intRate} > 10"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unbalanced parenthesis"), "stderr: {stderr}");
}

#[test]
fn test_plan_limits_orders_by_cash_and_requests_top_up() {
    let dir = setup(r#"{"basic": ["{grade} == C"]}"#);
    write_file(
        &dir.path().join("config.json"),
        r#"{"account": {"iid": 4242, "orderamnt": 25, "min_balance": 500}}"#,
    );
    let loans = dir.path().join("loans.json");
    let output = run(
        &dir,
        &[
            "plan",
            "--loans",
            loans.to_str().expect("utf8 path"),
            "--cash",
            "60",
            "--pending",
            "100",
            "--json",
        ],
    );

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let payload: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout should be JSON");
    assert_eq!(payload["order"]["aid"], "4242");
    assert_eq!(payload["order"]["orders"].as_array().map(Vec::len), Some(2));
    assert_eq!(payload["order"]["orders"][0]["loanId"], "101");
    assert_eq!(payload["transfer"], 350.0);
}

#[test]
fn test_missing_filters_file_is_an_error() {
    let dir = tempdir().expect("temp dir");
    let loans = dir.path().join("loans.json");
    write_file(&loans, LISTING);
    let output = run(&dir, &["select", "--loans", loans.to_str().expect("utf8 path")]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("filters.json"), "stderr: {stderr}");
}

const NOTES: &str = r#"{"myNotes": [
    {"loanId": 201, "noteId": 1, "loanStatus": "Current", "interestRate": 12.0, "grade": "B1"},
    {"loanId": 202, "noteId": 2, "loanStatus": "Late (31-120 days)", "interestRate": 18.0, "grade": "D3"},
    {"loanId": 203, "noteId": 3, "loanStatus": "Fully Paid", "interestRate": 6.0, "grade": "A1"}
]}"#;

#[test]
fn test_notes_summary_json() {
    let dir = tempdir().expect("temp dir");
    let notes = dir.path().join("notes.json");
    write_file(&notes, NOTES);
    let output = run(&dir, &["notes", "--notes", notes.to_str().expect("utf8 path"), "--json"]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let summary: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout should be JSON");
    assert_eq!(summary["counted"], 2);
    assert_eq!(summary["late"], 1);
    assert_eq!(summary["closed"], 1);
    assert_eq!(summary["average_rate"], 15.0);
    assert_eq!(summary["grades"]["D"], 1);
}

#[test]
fn test_notes_late_only_lists_late_notes() {
    let dir = tempdir().expect("temp dir");
    let notes = dir.path().join("notes.json");
    write_file(&notes, NOTES);
    let output = run(&dir, &["notes", "--notes", notes.to_str().expect("utf8 path"), "--late-only"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("1 late note(s)"), "stdout: {text}");
    assert!(text.contains("202"), "stdout: {text}");
    assert!(!text.contains("201"), "stdout: {text}");
}

#[test]
fn test_notes_on_empty_account() {
    let dir = tempdir().expect("temp dir");
    let notes = dir.path().join("notes.json");
    write_file(&notes, r#"{"myNotes": []}"#);
    let output = run(&dir, &["notes", "--notes", notes.to_str().expect("utf8 path")]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("0 note(s) owned"));
}
