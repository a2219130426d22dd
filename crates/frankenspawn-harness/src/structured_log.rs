//! Structured JSONL evidence for spawn verification runs.
//!
//! Provides:
//! - [`LogEntry`]: one JSONL record, with required and optional fields.
//! - [`LogEmitter`]: writes records to a file or an in-memory buffer.
//! - [`validate_log_line`] / [`validate_log_file`]: schema checks.
//! - [`ArtifactIndex`]: links a run to its artifacts by SHA-256 digest.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Verification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
    Error,
}

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "fatal"];
const MODES: [&str; 3] = ["strict", "hardened", "off"];
const OUTCOMES: [&str; 4] = ["pass", "fail", "skip", "error"];
const STRATEGIES: [&str; 2] = ["fork", "vfork"];

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// `fork` or `vfork`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ns: Option<u64>,
    /// Name of the healing action applied in hardened mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healing_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_refs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            run_id: None,
            symbol: None,
            mode: None,
            strategy: None,
            outcome: None,
            errno: None,
            exit_code: None,
            latency_ns: None,
            healing_action: None,
            artifact_refs: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Set the C symbol under test.
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Set the runtime mode.
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_errno(mut self, errno: i32) -> Self {
        self.errno = Some(errno);
        self
    }

    #[must_use]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    #[must_use]
    pub fn with_latency_ns(mut self, ns: u64) -> Self {
        self.latency_ns = Some(ns);
        self
    }

    #[must_use]
    pub fn with_healing_action(mut self, action: impl Into<String>) -> Self {
        self.healing_action = Some(action.into());
        self
    }

    /// Add artifact references.
    #[must_use]
    pub fn with_artifacts(mut self, refs: Vec<String>) -> Self {
        self.artifact_refs = Some(refs);
        self
    }

    /// Set free-form details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

/// Writes JSONL log entries, numbering trace ids per run.
pub struct LogEmitter {
    writer: Box<dyn Write>,
    seq: u64,
    campaign: String,
    run_id: String,
}

impl LogEmitter {
    /// Create an emitter that writes to a file.
    pub fn to_file(path: &Path, campaign: &str, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::with_writer(
            Box::new(std::io::BufWriter::new(file)),
            campaign,
            run_id,
        ))
    }

    /// Create an emitter that discards output into a buffer (for testing).
    #[must_use]
    pub fn to_buffer(campaign: &str, run_id: &str) -> Self {
        Self::with_writer(Box::new(Vec::new()), campaign, run_id)
    }

    fn with_writer(writer: Box<dyn Write>, campaign: &str, run_id: &str) -> Self {
        Self {
            writer,
            seq: 0,
            campaign: campaign.to_string(),
            run_id: run_id.to_string(),
        }
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{}::{:03}", self.campaign, self.run_id, self.seq)
    }

    /// Emit a bare event with a generated trace id.
    pub fn emit(&mut self, level: LogLevel, event: &str) -> std::io::Result<LogEntry> {
        let trace_id = self.next_trace_id();
        let entry = LogEntry::new(trace_id, level, event).with_run(&self.run_id);
        self.write_line(&entry)?;
        Ok(entry)
    }

    /// Emit a populated entry, filling in `trace_id` and `run_id` when empty.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        if entry.run_id.is_none() {
            entry.run_id = Some(self.run_id.clone());
        }
        self.write_line(&entry)
    }

    fn write_line(&mut self, entry: &LogEntry) -> std::io::Result<()> {
        let line = entry.to_jsonl().map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation error for a log line.
#[derive(Debug)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

fn check_enum(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
    allowed: &[&str],
    line_number: usize,
    errors: &mut Vec<LogValidationError>,
) {
    if let Some(value) = obj.get(field).and_then(|v| v.as_str())
        && !allowed.contains(&value)
    {
        errors.push(LogValidationError {
            line_number,
            field: field.to_string(),
            message: format!("invalid {field}: '{value}'"),
        });
    }
}

/// Validate a single JSONL line and return the parsed entry.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut errors = Vec::new();

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            errors.push(LogValidationError {
                line_number,
                field: "<json>".to_string(),
                message: format!("invalid JSON: {e}"),
            });
            return Err(errors);
        }
    };

    let Some(obj) = value.as_object() else {
        errors.push(LogValidationError {
            line_number,
            field: "<root>".to_string(),
            message: "expected JSON object".to_string(),
        });
        return Err(errors);
    };

    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            errors.push(LogValidationError {
                line_number,
                field: field.to_string(),
                message: "required field missing".to_string(),
            });
        }
    }

    check_enum(obj, "level", &LEVELS, line_number, &mut errors);
    check_enum(obj, "mode", &MODES, line_number, &mut errors);
    check_enum(obj, "outcome", &OUTCOMES, line_number, &mut errors);
    check_enum(obj, "strategy", &STRATEGIES, line_number, &mut errors);

    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str())
        && !trace_id.contains("::")
    {
        errors.push(LogValidationError {
            line_number,
            field: "trace_id".to_string(),
            message: format!(
                "trace_id should follow <campaign>::<run_id>::<seq> format, got: '{trace_id}'"
            ),
        });
    }

    // A failed spawn call must say why.
    if obj.get("outcome").and_then(|v| v.as_str()) == Some("fail")
        && obj.get("event").and_then(|v| v.as_str()) == Some("spawn_failed")
        && !obj.get("errno").is_some_and(serde_json::Value::is_i64)
    {
        errors.push(LogValidationError {
            line_number,
            field: "errno".to_string(),
            message: "spawn_failed events must carry an errno".to_string(),
        });
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value::<LogEntry>(value).map_err(|e| {
        vec![LogValidationError {
            line_number,
            field: "<deserialization>".to_string(),
            message: format!("failed to deserialize: {e}"),
        }]
    })
}

/// Validate an entire JSONL file.
///
/// Returns the non-empty line count and every validation error found.
pub fn validate_log_file(path: &Path) -> Result<(usize, Vec<LogValidationError>), std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let mut all_errors = Vec::new();
    let mut line_count = 0;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        if let Err(errs) = validate_log_line(line, i + 1) {
            all_errors.extend(errs);
        }
    }

    Ok((line_count, all_errors))
}

// ---------------------------------------------------------------------------
// Artifact index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub kind: String,
    pub sha256: String,
    pub size_bytes: u64,
}

/// Artifact index linking a run's logs and fixtures by digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactIndex {
    pub index_version: u32,
    pub run_id: String,
    pub generated_utc: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl ArtifactIndex {
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            index_version: 1,
            run_id: run_id.into(),
            generated_utc: now_utc(),
            artifacts: Vec::new(),
        }
    }

    /// Hash `path` and record it under `kind`.
    pub fn add_file(&mut self, path: &Path, kind: &str) -> std::io::Result<&mut Self> {
        let bytes = std::fs::read(path)?;
        self.artifacts.push(ArtifactEntry {
            path: path.display().to_string(),
            kind: kind.to_string(),
            sha256: sha256_hex(&bytes),
            size_bytes: bytes.len() as u64,
        });
        Ok(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Current time as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
#[must_use]
pub fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(duration.as_secs(), duration.subsec_millis())
}

fn format_utc(secs: u64, millis: u32) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
    )
}

// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_serializes_required_fields() {
        let entry = LogEntry::new("spawn::run-1::001", LogLevel::Info, "campaign_start");
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["timestamp"].is_string());
        assert_eq!(parsed["trace_id"], "spawn::run-1::001");
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["event"], "campaign_start");
        assert!(parsed.get("mode").is_none());
        assert!(parsed.get("strategy").is_none());
    }

    #[test]
    fn log_entry_with_spawn_fields() {
        let entry = LogEntry::new("spawn::run-1::002", LogLevel::Error, "spawn_failed")
            .with_symbol("posix_spawn")
            .with_mode("hardened")
            .with_strategy("vfork")
            .with_outcome(Outcome::Fail)
            .with_errno(2)
            .with_healing_action("ReportChildFailure")
            .with_latency_ns(150)
            .with_artifacts(vec![String::from("logs/run-1.jsonl")]);
        let parsed: serde_json::Value = serde_json::from_str(&entry.to_jsonl().unwrap()).unwrap();
        assert_eq!(parsed["symbol"], "posix_spawn");
        assert_eq!(parsed["strategy"], "vfork");
        assert_eq!(parsed["outcome"], "fail");
        assert_eq!(parsed["errno"], 2);
        assert_eq!(parsed["healing_action"], "ReportChildFailure");
        assert!(parsed["artifact_refs"].is_array());
        assert!(validate_log_line(&entry.to_jsonl().unwrap(), 1).is_ok());
    }

    #[test]
    fn validate_missing_required_field() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00.000Z","level":"info","event":"x"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "trace_id"));
    }

    #[test]
    fn validate_rejects_unknown_enums() {
        let json = r#"{"timestamp":"t","trace_id":"a::b::1","level":"critical","event":"x","mode":"lenient","strategy":"clone3"}"#;
        let errors = validate_log_line(json, 4).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"level"));
        assert!(fields.contains(&"mode"));
        assert!(fields.contains(&"strategy"));
        assert!(errors.iter().all(|e| e.line_number == 4));
    }

    #[test]
    fn validate_spawn_failed_needs_errno() {
        let json = r#"{"timestamp":"t","trace_id":"a::b::1","level":"error","event":"spawn_failed","outcome":"fail"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "errno"));
    }

    #[test]
    fn validate_bad_json_and_trace_id() {
        assert!(
            validate_log_line("not json", 1)
                .unwrap_err()
                .iter()
                .any(|e| e.field == "<json>")
        );
        let json = r#"{"timestamp":"t","trace_id":"flat","level":"info","event":"x"}"#;
        assert!(
            validate_log_line(json, 1)
                .unwrap_err()
                .iter()
                .any(|e| e.field == "trace_id")
        );
    }

    #[test]
    fn emitter_numbers_trace_ids() {
        let mut emitter = LogEmitter::to_buffer("spawn", "run-42");
        let e1 = emitter.emit(LogLevel::Info, "start").unwrap();
        let e2 = emitter.emit(LogLevel::Info, "end").unwrap();
        assert_eq!(e1.trace_id, "spawn::run-42::001");
        assert_eq!(e2.trace_id, "spawn::run-42::002");
        assert_eq!(e1.run_id.as_deref(), Some("run-42"));
    }

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn artifact_index_hashes_files() {
        let path = std::env::temp_dir().join(format!("fspawn-artifact-{}", std::process::id()));
        std::fs::write(&path, b"abc").unwrap();
        let mut idx = ArtifactIndex::new("run-1");
        idx.add_file(&path, "log").unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(idx.artifacts.len(), 1);
        assert_eq!(idx.artifacts[0].size_bytes, 3);
        assert_eq!(idx.artifacts[0].sha256, sha256_hex(b"abc"));
        let parsed: serde_json::Value = serde_json::from_str(&idx.to_json().unwrap()).unwrap();
        assert_eq!(parsed["index_version"], 1);
    }

    #[test]
    fn utc_formatting() {
        assert_eq!(format_utc(0, 0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_utc(951_782_400, 5), "2000-02-29T00:00:00.005Z");
        assert_eq!(format_utc(1_767_225_599, 999), "2025-12-31T23:59:59.999Z");
    }
}
