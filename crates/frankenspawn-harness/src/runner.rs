//! Test execution engine.

use std::time::Instant;

use frankenspawn_abi::{SpawnRequest, admit_spawn_flags, wait_for_exit};
use frankenspawn_core::process::ExitOutcome;
use frankenspawn_core::spawn::{FileActionList, SpawnAttributes, SpawnError};
use frankenspawn_membrane::config::SafetyLevel;

use crate::fixtures::{FixtureCase, FixtureSet};
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
use crate::verify::VerificationResult;

/// Runs a fixture set and collects verification results.
pub struct TestRunner {
    /// Name of the test campaign.
    pub campaign: String,
    /// Mode being tested.
    pub mode: SafetyLevel,
}

/// What actually happened for one case.
struct Execution {
    strategy: String,
    actual: String,
    errno: Option<i32>,
    exit_code: Option<i32>,
    latency_ns: u64,
}

impl Execution {
    fn rejected(strategy: &str, err: SpawnError, started: Instant) -> Self {
        Self {
            strategy: strategy.to_string(),
            actual: format!("errno:{}", err.errno()),
            errno: Some(err.errno()),
            exit_code: None,
            latency_ns: elapsed_ns(started),
        }
    }
}

fn elapsed_ns(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

impl TestRunner {
    /// Create a new test runner.
    #[must_use]
    pub fn new(campaign: impl Into<String>, mode: SafetyLevel) -> Self {
        Self {
            campaign: campaign.into(),
            mode,
        }
    }

    /// Run all fixtures in a set that apply to this runner's mode.
    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        fixture_set
            .cases
            .iter()
            .filter(|case| mode_matches(self.mode, &case.mode))
            .map(|case| self.run_case(&fixture_set.family, case))
            .collect()
    }

    fn run_case(&self, family: &str, case: &FixtureCase) -> VerificationResult {
        let case_name = if case.mode.eq_ignore_ascii_case("both") {
            format!("{} [{}]", case.name, self.mode.as_str())
        } else {
            case.name.clone()
        };
        let mut result = VerificationResult {
            case_name,
            family: family.to_string(),
            symbol: case.symbol().to_string(),
            mode: self.mode.as_str().to_string(),
            strategy: String::new(),
            passed: false,
            expected: String::new(),
            actual: String::new(),
            errno: None,
            exit_code: None,
            latency_ns: 0,
            diff: None,
        };

        let expected = match case.expected_output() {
            Ok(expected) => expected,
            Err(err) => {
                result.actual = format!("invalid:{err}");
                result.diff = Some(err.to_string());
                return result;
            }
        };
        let run = self.execute(case);

        let mut notes = Vec::new();
        if run.actual != expected {
            notes.push(format!("- {expected}\n+ {}", run.actual));
        }
        match &case.expected_strategy {
            Some(want) if !want.eq_ignore_ascii_case(&run.strategy) => {
                notes.push(format!("strategy: expected {want}, got {}", run.strategy));
            }
            _ => {}
        }

        result.passed = notes.is_empty();
        result.diff = (!notes.is_empty()).then(|| notes.join("\n"));
        result.expected = expected;
        result.actual = run.actual;
        result.strategy = run.strategy;
        result.errno = run.errno;
        result.exit_code = run.exit_code;
        result.latency_ns = run.latency_ns;
        result
    }

    fn build_request(&self, case: &FixtureCase) -> Result<SpawnRequest, SpawnError> {
        let mut request = SpawnRequest::new(&case.program)?;
        request
            .args(case.args.iter().map(String::as_str))?
            .search_path(case.search_path);
        if let Some(env) = &case.env {
            request.env_clear();
            for (key, value) in env {
                request.env(key, value)?;
            }
        }

        if case.flags.is_some() || case.process_group.is_some() {
            let mut attrs = SpawnAttributes::new();
            if let Some(bits) = case.flags {
                attrs.set_flags(admit_spawn_flags(self.mode, bits))?;
            }
            if let Some(pgroup) = case.process_group {
                attrs.set_process_group(pgroup);
            }
            request.attributes(attrs);
        }

        if !case.file_actions.is_empty() {
            let mut actions = FileActionList::new();
            for action in &case.file_actions {
                action.append_to(&mut actions)?;
            }
            request.file_actions(actions);
        }
        Ok(request)
    }

    fn execute(&self, case: &FixtureCase) -> Execution {
        let started = Instant::now();
        let request = match self.build_request(case) {
            Ok(request) => request,
            Err(err) => return Execution::rejected("none", err, started),
        };
        let strategy = request.strategy().as_str();

        let pid = match request.spawn_in(self.mode) {
            Ok(pid) => pid,
            Err(err) => return Execution::rejected(strategy, err, started),
        };
        let outcome = wait_for_exit(pid);
        let latency_ns = elapsed_ns(started);
        let (actual, exit_code) = match outcome {
            Ok(ExitOutcome::Exited(code)) => (format!("exit:{code}"), Some(code)),
            Ok(ExitOutcome::Signaled(sig)) => (format!("signal:{sig}"), None),
            Ok(ExitOutcome::Stopped(sig)) => (format!("stopped:{sig}"), None),
            Err(err) => (format!("wait_errno:{}", err.errno()), None),
        };
        Execution {
            strategy: strategy.to_string(),
            actual,
            errno: None,
            exit_code,
            latency_ns,
        }
    }
}

fn mode_matches(active: SafetyLevel, case_mode: &str) -> bool {
    case_mode.eq_ignore_ascii_case("both") || case_mode.eq_ignore_ascii_case(active.as_str())
}

/// Structured log record for one result.
#[must_use]
pub fn result_log_entry(result: &VerificationResult) -> LogEntry {
    let (level, outcome) = if result.passed {
        (LogLevel::Info, Outcome::Pass)
    } else {
        (LogLevel::Error, Outcome::Fail)
    };
    let mut entry = LogEntry::new("", level, "spawn_case")
        .with_symbol(&result.symbol)
        .with_mode(&result.mode)
        .with_outcome(outcome)
        .with_latency_ns(result.latency_ns)
        .with_details(serde_json::json!({
            "case": result.case_name,
            "family": result.family,
            "expected": result.expected,
            "actual": result.actual,
        }));
    if !result.strategy.is_empty() && result.strategy != "none" {
        entry = entry.with_strategy(&result.strategy);
    }
    if let Some(errno) = result.errno {
        entry = entry.with_errno(errno);
    }
    if let Some(code) = result.exit_code {
        entry = entry.with_exit_code(code);
    }
    entry
}

/// Emit one log line per result.
pub fn log_results(
    emitter: &mut LogEmitter,
    results: &[VerificationResult],
) -> std::io::Result<()> {
    for result in results {
        emitter.emit_entry(result_log_entry(result))?;
    }
    emitter.flush()
}
