use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// One symbol-lookup case from the cases file.
///
/// Fields the harness does not interpret are kept in `extra` so the report
/// reproduces the case exactly as it was loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub repo: String,
    pub symbol: String,
    pub rg_pattern: String,
    /// Outer `None` when the key is absent, `Some(None)` for an explicit null.
    #[serde(
        default,
        deserialize_with = "present_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub rg_glob: Option<Option<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Case {
    pub fn glob(&self) -> Option<&str> {
        self.rg_glob
            .as_ref()
            .and_then(Option::as_deref)
            .filter(|glob| !glob.is_empty())
    }
}

fn present_key<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CasesFile {
    pub cases: Vec<Case>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BenchMode {
    FirstRun,
    QueryOnly,
}

impl BenchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstRun => "first-run",
            Self::QueryOnly => "query-only",
        }
    }
}

impl fmt::Display for BenchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidityVerdict {
    pub is_valid: bool,
    pub reason: Option<String>,
}

impl ValidityVerdict {
    pub fn from_counts(counts: CaseCounts) -> Self {
        if counts.code_indexer == counts.rg {
            Self {
                is_valid: true,
                reason: None,
            }
        } else {
            Self {
                is_valid: false,
                reason: Some(format!(
                    "count mismatch: code_indexer={}, rg={}",
                    counts.code_indexer, counts.rg
                )),
            }
        }
    }
}

/// Descriptive statistics over one tool's timings, in milliseconds.
///
/// Either every statistic is present or none is; the empty form is what
/// unmeasured records carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub samples_ms: Vec<f64>,
    pub median_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub cv_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseCounts {
    pub code_indexer: usize,
    pub rg: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCommands {
    pub code_indexer: String,
    pub rg: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolTimings {
    pub code_indexer: SampleSummary,
    pub rg: SampleSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Speedup {
    pub median_ratio_rg_over_code_indexer: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub repo: String,
    pub mode: BenchMode,
    pub case_id: String,
    pub symbol: String,
    pub counts: CaseCounts,
    pub validity: ValidityVerdict,
    pub commands: ToolCommands,
    pub timings: ToolTimings,
    pub speedup: Speedup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeSummary {
    pub total_cases: usize,
    pub valid_cases: usize,
    pub invalid_cases: usize,
    pub median_speedup_rg_over_code_indexer: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub by_mode: BTreeMap<String, ModeSummary>,
    pub selected_case_count: usize,
    #[serde(default)]
    pub repos_without_valid: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    pub hostname: String,
    pub os: String,
    pub arch: String,
    pub cpu_cores: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersions {
    pub code_indexer: Option<String>,
    pub rg: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limitations {
    pub page_cache_flush: String,
    pub coldness: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    pub generated_at_utc: String,
    pub harness_version: String,
    pub project_root: String,
    pub code_indexer_git_commit: String,
    pub mode: String,
    pub runs: u32,
    pub warmup: u32,
    pub repos: String,
    pub cases_path: String,
    pub cases_sha256: String,
    pub machine: MachineInfo,
    pub tool_versions: ToolVersions,
    pub limitations: Limitations,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedReport {
    pub meta: ReportMeta,
    pub cases: Vec<Case>,
    pub results: Vec<ResultRecord>,
    pub summary: RunSummary,
}
