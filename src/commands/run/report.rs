use std::path::Path;

use crate::model::{
    Case, Limitations, MachineInfo, ReportMeta, ResultRecord, RunSummary, SampleSummary,
    SpeedReport, ToolVersions,
};
use crate::util::{command_first_line, now_utc_string};

/// Run parameters recorded verbatim in the report metadata.
#[derive(Debug, Clone)]
pub struct RunDescriptor {
    pub mode: String,
    pub runs: u32,
    pub warmup: u32,
    pub repos: String,
    pub project_root: String,
    pub cases_path: String,
    pub cases_sha256: String,
}

pub fn build_report(
    descriptor: RunDescriptor,
    provenance: Provenance,
    cases: Vec<Case>,
    results: Vec<ResultRecord>,
    summary: RunSummary,
) -> SpeedReport {
    SpeedReport {
        meta: ReportMeta {
            generated_at_utc: provenance.generated_at_utc,
            harness_version: env!("CARGO_PKG_VERSION").to_string(),
            project_root: descriptor.project_root,
            code_indexer_git_commit: provenance.git_commit,
            mode: descriptor.mode,
            runs: descriptor.runs,
            warmup: descriptor.warmup,
            repos: descriptor.repos,
            cases_path: descriptor.cases_path,
            cases_sha256: descriptor.cases_sha256,
            machine: provenance.machine,
            tool_versions: provenance.tool_versions,
            limitations: Limitations {
                page_cache_flush: "not performed".to_string(),
                coldness: "process-cold only, not guaranteed disk-cold".to_string(),
            },
        },
        cases,
        results,
        summary,
    }
}

/// Environment facts gathered once per run. Every probe degrades to a
/// placeholder instead of failing the run.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub generated_at_utc: String,
    pub git_commit: String,
    pub machine: MachineInfo,
    pub tool_versions: ToolVersions,
}

impl Provenance {
    pub fn collect(project_root: &Path, code_indexer: &Path, rg_program: &str) -> Self {
        let code_indexer = code_indexer.display().to_string();
        Self {
            generated_at_utc: now_utc_string(),
            git_commit: command_first_line("git", &["rev-parse", "HEAD"], Some(project_root))
                .unwrap_or_else(|| "unknown".to_string()),
            machine: MachineInfo {
                hostname: hostname(),
                os: std::env::consts::OS.to_string(),
                arch: std::env::consts::ARCH.to_string(),
                cpu_cores: std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1),
            },
            tool_versions: ToolVersions {
                code_indexer: command_first_line(&code_indexer, &["--version"], None),
                rg: command_first_line(rg_program, &["--version"], None),
            },
        }
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| command_first_line("hostname", &[], None))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Human-readable tables derived from an already complete report.
pub fn render_markdown(report: &SpeedReport) -> String {
    let meta = &report.meta;
    let mut lines = Vec::<String>::new();

    lines.push("# Honest Speed Benchmark Report".to_string());
    lines.push(String::new());
    lines.push(format!("Generated at (UTC): `{}`", meta.generated_at_utc));
    lines.push(format!("Git commit: `{}`", meta.code_indexer_git_commit));
    lines.push(format!(
        "Mode: `{}`, runs: `{}`, warmup: `{}`",
        meta.mode, meta.runs, meta.warmup
    ));
    lines.push(format!(
        "Machine: `{}` ({}/{}, {} cores)",
        meta.machine.hostname, meta.machine.os, meta.machine.arch, meta.machine.cpu_cores
    ));
    lines.push(String::new());
    lines.push(format!(
        "Limitation: page-cache flush {}; results are {}.",
        meta.limitations.page_cache_flush, meta.limitations.coldness
    ));
    lines.push(String::new());

    lines.push("## Summary".to_string());
    lines.push(String::new());
    lines.push("| mode | total | valid | invalid | median speedup (rg/code-indexer) |".to_string());
    lines.push("|------|------:|------:|--------:|----------------------------------:|".to_string());
    for (mode, stats) in &report.summary.by_mode {
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            mode,
            stats.total_cases,
            stats.valid_cases,
            stats.invalid_cases,
            speedup_cell(stats.median_speedup_rg_over_code_indexer)
        ));
    }

    let mut modes = report
        .results
        .iter()
        .map(|item| item.mode)
        .collect::<Vec<_>>();
    modes.sort();
    modes.dedup();

    for mode in modes {
        lines.push(String::new());
        lines.push(format!("## Details: {mode}"));
        lines.push(String::new());
        lines.push(
            "| repo | case | symbol | validity | counts (code/rg) | median ms (code/rg) | p95 ms (code/rg) | cv% (code/rg) | speedup |"
                .to_string(),
        );
        lines.push(
            "|------|------|--------|----------|------------------|---------------------|------------------|----------------|---------|"
                .to_string(),
        );

        for item in report.results.iter().filter(|item| item.mode == mode) {
            let validity = if item.validity.is_valid {
                "valid".to_string()
            } else {
                format!(
                    "invalid ({})",
                    item.validity.reason.as_deref().unwrap_or("unknown")
                )
            };
            let code = &item.timings.code_indexer;
            let rg = &item.timings.rg;

            lines.push(format!(
                "| {} | {} | {} | {} | {}/{} | {} | {} | {} | {} |",
                cell(&item.repo),
                cell(&item.case_id),
                cell(&item.symbol),
                cell(&validity),
                item.counts.code_indexer,
                item.counts.rg,
                pair(code, rg, |summary| summary.median_ms),
                pair(code, rg, |summary| summary.p95_ms),
                pair(code, rg, |summary| summary.cv_pct),
                speedup_cell(item.speedup.median_ratio_rg_over_code_indexer)
            ));
        }
    }

    lines.join("\n") + "\n"
}

/// Table cell text with pipes escaped so the row keeps its column count.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn pair(
    code: &SampleSummary,
    rg: &SampleSummary,
    metric: impl Fn(&SampleSummary) -> Option<f64>,
) -> String {
    match (metric(code), metric(rg)) {
        (Some(left), Some(right)) => format!("{left:.3}/{right:.3}"),
        _ => "n/a".to_string(),
    }
}

fn speedup_cell(speedup: Option<f64>) -> String {
    speedup
        .map(|value| format!("{value:.3}x"))
        .unwrap_or_else(|| "n/a".to_string())
}
