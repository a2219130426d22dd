//! Integration test: the spawn smoke fixtures pass in strict and hardened mode.

use std::path::{Path, PathBuf};

use frankenspawn_harness::structured_log::{LogEmitter, validate_log_file};
use frankenspawn_harness::{FixtureSet, TestRunner, VerificationSummary, runner};
use frankenspawn_membrane::config::SafetyLevel;

fn fixture_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/spawn_smoke.v1.json")
}

fn load() -> FixtureSet {
    FixtureSet::from_file(&fixture_path()).expect("smoke fixture should load")
}

fn run(mode: SafetyLevel) -> VerificationSummary {
    VerificationSummary::from_results(TestRunner::new("smoke", mode).run(&load()))
}

fn assert_all_passed(summary: &VerificationSummary) {
    let failures: Vec<_> = summary
        .failures()
        .map(|r| format!("{}: {}", r.case_name, r.diff.as_deref().unwrap_or("")))
        .collect();
    assert!(failures.is_empty(), "failing cases:\n{}", failures.join("\n"));
}

#[test]
fn smoke_fixtures_pass_in_strict_mode() {
    let summary = run(SafetyLevel::Strict);
    assert_eq!(summary.total, 10);
    assert_all_passed(&summary);
    assert!(
        summary
            .results
            .iter()
            .any(|r| r.case_name == "true_plain [strict]")
    );
}

#[test]
fn smoke_fixtures_pass_in_hardened_mode() {
    let summary = run(SafetyLevel::Hardened);
    assert_eq!(summary.total, 10);
    assert_all_passed(&summary);
    let enoent = summary
        .results
        .iter()
        .find(|r| r.case_name == "missing_program_reports_enoent")
        .expect("hardened-only case should run");
    assert_eq!(enoent.errno, Some(2));
    assert_eq!(enoent.strategy, "vfork");
}

#[test]
fn results_log_as_valid_jsonl() {
    let results = TestRunner::new("smoke", SafetyLevel::Strict).run(&load());
    let path = std::env::temp_dir().join(format!("fspawn-smoke-{}.jsonl", std::process::id()));
    {
        let mut emitter = LogEmitter::to_file(&path, "smoke", "run-1").unwrap();
        runner::log_results(&mut emitter, &results).unwrap();
    }
    let (lines, errors) = validate_log_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(lines, results.len());
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn fixture_round_trips_through_json() {
    let set = load();
    let again = FixtureSet::from_json(&set.to_json().unwrap()).unwrap();
    assert_eq!(again.cases.len(), set.cases.len());
    assert_eq!(again.cases[4].file_actions, set.cases[4].file_actions);
}
