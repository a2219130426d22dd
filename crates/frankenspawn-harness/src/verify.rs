//! Verification results and their summary.

use serde::{Deserialize, Serialize};

/// Result of running one fixture case in one mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub case_name: String,
    pub family: String,
    pub symbol: String,
    pub mode: String,
    pub strategy: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub latency_ns: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// Aggregate over a verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Failed results only.
    pub fn failures(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, passed: bool) -> VerificationResult {
        VerificationResult {
            case_name: name.to_string(),
            family: String::from("spawn/smoke"),
            symbol: String::from("posix_spawn"),
            mode: String::from("strict"),
            strategy: String::from("vfork"),
            passed,
            expected: String::from("exit:0"),
            actual: if passed { "exit:0" } else { "exit:1" }.to_string(),
            errno: None,
            exit_code: Some(i32::from(!passed)),
            latency_ns: 0,
            diff: None,
        }
    }

    #[test]
    fn summary_counts() {
        let summary =
            VerificationSummary::from_results(vec![result("a", true), result("b", false)]);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_passed());
        assert_eq!(summary.failures().next().unwrap().case_name, "b");
    }
}
