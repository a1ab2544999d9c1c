// End-to-end tests for the `rbook` binary.
//
// Every invocation pins --config to a fixture so the user's settings file
// never leaks into results. stdout carries only CSV or JSON; notices and
// progress go to stderr.

use std::path::PathBuf;
use std::process::{Command, Output};

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn rbook(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rbook"))
        .arg("--config")
        .arg(fixture("settings.toml"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run rbook")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "exit code: {:?}\nstderr: {}",
        output.status,
        stderr(output)
    );
}

// ===========================================================================
// rbook prepare
// ===========================================================================

#[test]
fn prepare_prints_summary() {
    let output = rbook(&["prepare", &fixture("report.csv")]);
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.starts_with("7 records: 5 CPD, 2 CPM\n"), "stdout: {text}");
    assert!(text.contains("cpd-rate"));
    assert!(text.contains("cpm-allocation"));
}

#[test]
fn prepare_json_is_a_single_value() {
    let output = rbook(&["prepare", &fixture("report.csv"), "--json"]);
    assert_success(&output);

    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).expect("valid JSON");
    assert_eq!(val["summary"]["cpd_records"], 5);
    assert_eq!(val["summary"]["cpm_records"], 2);
    assert_eq!(val["views"]["cpd-rate"]["rows"].as_array().unwrap().len(), 2);
    assert_eq!(val["views"]["cpd-rate"]["rows"][0]["property"], "Sports");
    assert_eq!(val["views"]["cpm-rate"]["rows"][0]["new_rate"], 0.0);
    assert!(val["notices"].as_array().unwrap().is_empty());
}

#[test]
fn prepare_filters_from_flags() {
    let output = rbook(&["prepare", &fixture("report.csv"), "--property", "News"]);
    assert_success(&output);
    assert!(stdout(&output).starts_with("2 records: 2 CPD, 0 CPM\n"));
}

#[test]
fn prepare_missing_file_is_io_error() {
    let output = rbook(&["prepare", &fixture("nope.csv")]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("error:"));
}

// ===========================================================================
// rbook export
// ===========================================================================

#[test]
fn export_applies_edits_to_stdout() {
    let output = rbook(&[
        "export",
        &fixture("report.csv"),
        "--view",
        "cpd-supply",
        "--edits",
        &fixture("supply_edits.csv"),
    ]);
    assert_success(&output);
    assert_eq!(stdout(&output), "id,inventory\nsup-100,105\n");
}

#[test]
fn impression_edits_set_rate_and_impressions() {
    let output = rbook(&[
        "export",
        &fixture("report.csv"),
        "--view",
        "cpd-impression",
        "--edits",
        &fixture("impression_edits.csv"),
    ]);
    assert_success(&output);
    assert_eq!(stdout(&output), "id,cpd_impressions,rate\nsup-100,25,12\n");
    assert!(stderr(&output).contains("2 rate change(s) in cpd-impression"));
}

#[test]
fn rate_column_is_rejected_for_other_views() {
    let output = rbook(&[
        "export",
        &fixture("report.csv"),
        "--view",
        "cpd-supply",
        "--edits",
        &fixture("impression_edits.csv"),
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("a `rate` column only applies to cpd-impression"));
}

#[test]
fn export_without_edits_has_header_only() {
    let output = rbook(&["export", &fixture("report.csv"), "--view", "cpd-rate"]);
    assert_success(&output);
    assert_eq!(stdout(&output), "id,rate\n");
    assert!(stderr(&output).contains("No changes to export"));
}

#[test]
fn export_into_directory_uses_suggested_name() {
    let dir = tempfile::tempdir().unwrap();
    let output = rbook(&[
        "export",
        &fixture("report.csv"),
        "--view",
        "cpd-supply",
        "--edits",
        &fixture("supply_edits.csv"),
        "--out",
        dir.path().to_str().unwrap(),
    ]);
    assert_success(&output);
    assert!(stdout(&output).is_empty());

    let written = std::fs::read_to_string(dir.path().join("cpd_supply_slot_update.csv")).unwrap();
    assert_eq!(written, "id,inventory\nsup-100,105\n");
}

#[test]
fn export_twice_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let mut contents = Vec::new();
    for name in ["first.csv", "second.csv"] {
        let path = dir.path().join(name);
        let output = rbook(&[
            "export",
            &fixture("report.csv"),
            "--view",
            "cpd-supply",
            "--edits",
            &fixture("supply_edits.csv"),
            "-o",
            path.to_str().unwrap(),
        ]);
        assert_success(&output);
        contents.push(std::fs::read(&path).unwrap());
    }
    assert_eq!(contents[0], contents[1]);
}

#[test]
fn unknown_edit_ids_warn_or_fail() {
    let args: [&str; 6] = [
        "export",
        &fixture("report.csv"),
        "--view",
        "cpd-supply",
        "--edits",
        &fixture("unknown_edits.csv"),
    ];
    let lenient = rbook(&args);
    assert_success(&lenient);
    assert!(stderr(&lenient).contains("sup-999"));

    let mut strict_args = args.to_vec();
    strict_args.push("--strict");
    let strict = rbook(&strict_args);
    assert_eq!(strict.status.code(), Some(11));
}

#[test]
fn strict_without_edits_is_usage_error() {
    let output = rbook(&["export", &fixture("report.csv"), "--view", "cpd-rate", "--strict"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("--strict requires --edits"));
}

#[test]
fn export_of_absent_partition_fails() {
    let output = rbook(&["export", &fixture("report_no_revenue_type.csv"), "--view", "cpd-rate"]);
    assert_eq!(output.status.code(), Some(10));
    assert!(stderr(&output).contains("hint:"));
}

#[test]
fn malformed_edits_are_parse_errors() {
    let output = rbook(&[
        "export",
        &fixture("report.csv"),
        "--view",
        "cpd-supply",
        "--edits",
        &fixture("bad_edits.csv"),
    ]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("'five' is not a number"));
}

#[test]
fn unknown_view_is_usage_error() {
    let output = rbook(&["export", &fixture("report.csv"), "--view", "rates"]);
    assert_eq!(output.status.code(), Some(2));
}

// ===========================================================================
// rbook validate / match
// ===========================================================================

#[test]
fn validate_flags_records_with_suggestions() {
    let output = rbook(&[
        "validate",
        &fixture("records.csv"),
        "--masters",
        &fixture("properties.csv"),
        &fixture("pages.csv"),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.starts_with("2 record(s) checked, 1 need review\n"), "stdout: {text}");
    assert!(text.contains("record 2: property 'Sportz'"));
    assert!(text.contains("did you mean: Sports"));
    assert!(stderr(&output).is_empty());
}

#[test]
fn validate_clean_records_succeeds() {
    let output = rbook(&[
        "validate",
        &fixture("clean_records.csv"),
        "--masters",
        &fixture("properties.csv"),
        &fixture("pages.csv"),
        "--json",
    ]);
    assert_success(&output);
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(val["records_checked"], 1);
    assert!(val["entries"].as_array().unwrap().is_empty());
}

#[test]
fn match_standardizes_abbreviations() {
    let output = rbook(&[
        "match",
        "Mbs Store",
        "--masters",
        &fixture("properties.csv"),
        "--json",
    ]);
    assert_success(&output);
    let val: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert_eq!(val[0]["category"], "property");
    assert_eq!(val[0]["matched_value"], "MSB Store");
    assert_eq!(val[0]["is_valid"], true);
}

#[test]
fn invalid_settings_file_is_config_error() {
    let settings = fixture("invalid_settings.toml");
    let report = fixture("report.csv");
    let output = Command::new(env!("CARGO_BIN_EXE_rbook"))
        .args(["--config", settings.as_str(), "prepare", report.as_str()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(5));
    assert!(stderr(&output).contains("top_n"));
}
