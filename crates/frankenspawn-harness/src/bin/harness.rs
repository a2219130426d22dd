//! CLI entrypoint for the FrankenSpawn verification harness.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use frankenspawn_core::spawn::{ForkStrategy, SpawnFlags};
use frankenspawn_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogLevel, validate_log_file,
};
use frankenspawn_harness::{FixtureSet, HarnessError, TestRunner, VerificationSummary, runner};
use frankenspawn_membrane::config::{SafetyLevel, override_safety_level};

/// Verification tooling for FrankenSpawn.
#[derive(Debug, Parser)]
#[command(name = "frankenspawn-harness")]
#[command(about = "Fixture-driven verification harness for FrankenSpawn")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run spawn fixtures and compare outcomes.
    Verify {
        /// Fixture JSON file, or a directory of them.
        #[arg(long)]
        fixture: PathBuf,
        /// Runtime mode to test (`strict`, `hardened`, or `both`).
        #[arg(long, default_value = "strict")]
        mode: String,
        /// Structured JSONL log output path.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Artifact index output path (requires `--log`).
        #[arg(long)]
        artifact_index: Option<PathBuf>,
    },
    /// Validate a structured JSONL log.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
    },
    /// Print the fork strategy a spawn would use.
    Strategy {
        /// Raw flag word.
        #[arg(long, default_value_t = 0)]
        flags: i16,
        /// Whether a non-empty file-action list is supplied.
        #[arg(long)]
        file_actions: bool,
    },
}

fn load_fixtures(path: &Path) -> Result<Vec<FixtureSet>, HarnessError> {
    if path.is_file() {
        return Ok(vec![FixtureSet::from_file(path)?]);
    }
    let mut files = Vec::new();
    let entries = std::fs::read_dir(path).map_err(|e| HarnessError::io(path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| HarnessError::io(path, e))?;
        let file = entry.path();
        if file.extension().is_some_and(|ext| ext == "json") {
            files.push(file);
        }
    }
    files.sort();
    files.iter().map(|f| FixtureSet::from_file(f)).collect()
}

fn parse_modes(mode: &str) -> Result<Vec<SafetyLevel>, HarnessError> {
    match mode.to_ascii_lowercase().as_str() {
        "strict" => Ok(vec![SafetyLevel::Strict]),
        "hardened" => Ok(vec![SafetyLevel::Hardened]),
        "both" => Ok(vec![SafetyLevel::Strict, SafetyLevel::Hardened]),
        other => Err(HarnessError::InvalidFixture {
            case: String::from("<cli>"),
            reason: format!("unknown mode '{other}'"),
        }),
    }
}

fn run_id() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("run-{secs}-{}", std::process::id())
}

fn verify(
    fixture: &Path,
    mode: &str,
    log: Option<&Path>,
    artifact_index: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let sets = load_fixtures(fixture)?;
    let modes = parse_modes(mode)?;
    let run_id = run_id();
    let mut emitter = match log {
        Some(path) => Some(LogEmitter::to_file(path, "spawn", &run_id)?),
        None => None,
    };
    if let Some(emitter) = emitter.as_mut() {
        emitter.emit(LogLevel::Info, "campaign_start")?;
    }

    let mut results = Vec::new();
    for level in modes {
        let previous = override_safety_level(level);
        let runner = TestRunner::new("spawn", level);
        for set in &sets {
            results.extend(runner.run(set));
        }
        override_safety_level(previous);
    }

    if let Some(emitter) = emitter.as_mut() {
        runner::log_results(emitter, &results)?;
    }

    let summary = VerificationSummary::from_results(results);
    for result in summary.failures() {
        eprintln!("FAIL {} ({}/{})", result.case_name, result.symbol, result.mode);
        if let Some(diff) = &result.diff {
            eprintln!("{diff}");
        }
    }
    println!(
        "{} cases: {} passed, {} failed",
        summary.total, summary.passed, summary.failed
    );

    if let (Some(log), Some(index_path)) = (log, artifact_index) {
        drop(emitter);
        let mut index = ArtifactIndex::new(&run_id);
        index.add_file(log, "log")?;
        if fixture.is_file() {
            index.add_file(fixture, "fixture")?;
        }
        std::fs::write(index_path, index.to_json()?)
            .map_err(|e| HarnessError::io(index_path, e))?;
    }

    if summary.all_passed() {
        Ok(())
    } else {
        Err(HarnessError::VerificationFailed {
            failed: summary.failed,
            total: summary.total,
        }
        .into())
    }
}

fn validate_log(log: &Path) -> Result<(), Box<dyn Error>> {
    let (lines, errors) = validate_log_file(log).map_err(|e| HarnessError::io(log, e))?;
    for error in &errors {
        eprintln!("{error}");
    }
    println!("{lines} lines, {} errors", errors.len());
    if errors.is_empty() {
        Ok(())
    } else {
        Err(format!("{} invalid log lines", errors.len()).into())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Verify {
            fixture,
            mode,
            log,
            artifact_index,
        } => verify(&fixture, &mode, log.as_deref(), artifact_index.as_deref()),
        Command::ValidateLog { log } => validate_log(&log),
        Command::Strategy {
            flags,
            file_actions,
        } => {
            let flags = SpawnFlags::from_bits(flags)?;
            println!("{}", ForkStrategy::select(flags, file_actions).as_str());
            Ok(())
        }
    }
}
