use std::collections::BTreeMap;

use anyhow::{Context, Result};
use tracing::info;

use super::invoke::{
    CODE_INDEXER_ALLOWED_STATUSES, CodeIndexer, CommandRunner, RG_ALLOWED_STATUSES, RepoIndex,
    Ripgrep,
};
use super::measure::{Clock, MeasurePlan, as_seconds};
use super::parity::{ParityCheck, check_parity};
use crate::model::{
    BenchMode, Case, ModeSummary, ResultRecord, RunSummary, SampleSummary, Speedup, ToolTimings,
};
use crate::stats::{median, summarize_samples};
use crate::util::round6;

/// What a single timed code-indexer iteration does in a given mode.
///
/// The reference tool has no persistent state, so its iteration is always a
/// single search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerStrategy {
    /// Query the index built once during repo setup.
    QueryPrebuilt,
    /// Remove the index, rebuild it, then query: a cold-start user.
    RebuildThenQuery,
}

impl From<BenchMode> for IndexerStrategy {
    fn from(mode: BenchMode) -> Self {
        match mode {
            BenchMode::QueryOnly => Self::QueryPrebuilt,
            BenchMode::FirstRun => Self::RebuildThenQuery,
        }
    }
}

/// Everything a run needs to drive both tools, borrowed for its duration.
pub struct Harness<'a, R: ?Sized, C: ?Sized> {
    pub indexer: &'a CodeIndexer,
    pub ripgrep: &'a Ripgrep,
    pub runner: &'a R,
    pub clock: &'a C,
    pub plan: MeasurePlan,
}

impl<R, C> Harness<'_, R, C>
where
    R: CommandRunner,
    C: Clock + ?Sized,
{
    /// One-time index build that every case of the repo runs after.
    pub fn prepare_repo(&self, index: &RepoIndex) -> Result<()> {
        info!(repo = %index.name(), "preparing index for parity precheck");
        index
            .rebuild(self.indexer, self.runner)
            .with_context(|| format!("failed to build index for repo {}", index.name()))
    }

    pub fn check_parity(&self, case: &Case, index: &RepoIndex) -> Result<ParityCheck> {
        check_parity(case, index, self.indexer, self.ripgrep, self.runner)
    }

    /// Builds the record for `(case, mode)`, timing both tools only when the
    /// parity check passed.
    pub fn evaluate(
        &self,
        case: &Case,
        mode: BenchMode,
        parity: &ParityCheck,
        index: &RepoIndex,
    ) -> Result<ResultRecord> {
        let mut record = unmeasured_record(case, mode, parity);
        if !parity.verdict.is_valid {
            return Ok(record);
        }

        let code_query = self.indexer.definition_invocation(index, &case.symbol);
        let rg_query =
            self.ripgrep
                .search_invocation(&case.rg_pattern, case.glob(), index.repo_path());

        let code_samples = match IndexerStrategy::from(mode) {
            IndexerStrategy::QueryPrebuilt => self.plan.measure(self.clock, || {
                self.runner.quiet(&code_query, CODE_INDEXER_ALLOWED_STATUSES)
            }),
            IndexerStrategy::RebuildThenQuery => self.plan.measure(self.clock, || {
                index.rebuild(self.indexer, self.runner)?;
                self.runner.quiet(&code_query, CODE_INDEXER_ALLOWED_STATUSES)
            }),
        }
        .with_context(|| format!("code-indexer measurement failed for case {} ({mode})", case.id))?;

        let rg_samples = self
            .plan
            .measure(self.clock, || self.runner.quiet(&rg_query, RG_ALLOWED_STATUSES))
            .with_context(|| format!("rg measurement failed for case {} ({mode})", case.id))?;

        record.timings = ToolTimings {
            code_indexer: summarize_samples(&as_seconds(&code_samples)),
            rg: summarize_samples(&as_seconds(&rg_samples)),
        };
        record.speedup = Speedup {
            median_ratio_rg_over_code_indexer: speedup_ratio(
                &record.timings.code_indexer,
                &record.timings.rg,
            ),
        };

        info!(
            case = %case.id,
            mode = %mode,
            code_indexer_median_ms = ?record.timings.code_indexer.median_ms,
            rg_median_ms = ?record.timings.rg.median_ms,
            speedup = ?record.speedup.median_ratio_rg_over_code_indexer,
            "measured"
        );

        Ok(record)
    }
}

pub fn unmeasured_record(case: &Case, mode: BenchMode, parity: &ParityCheck) -> ResultRecord {
    ResultRecord {
        repo: case.repo.clone(),
        mode,
        case_id: case.id.clone(),
        symbol: case.symbol.clone(),
        counts: parity.counts,
        validity: parity.verdict.clone(),
        commands: parity.commands.clone(),
        timings: ToolTimings::default(),
        speedup: Speedup::default(),
    }
}

/// `median(rg) / median(code-indexer)`, present only when both medians exist
/// and the code-indexer median is strictly positive.
pub fn speedup_ratio(code_indexer: &SampleSummary, rg: &SampleSummary) -> Option<f64> {
    match (code_indexer.median_ms, rg.median_ms) {
        (Some(code), Some(reference)) if code > 0.0 => Some(round6(reference / code)),
        _ => None,
    }
}

pub fn summarize_run(
    results: &[ResultRecord],
    modes: &[BenchMode],
    selected_case_count: usize,
    repos_without_valid: Vec<String>,
) -> RunSummary {
    let mut by_mode = BTreeMap::new();
    for &mode in modes {
        let mode_items = results
            .iter()
            .filter(|item| item.mode == mode)
            .collect::<Vec<_>>();
        let valid_items = mode_items
            .iter()
            .filter(|item| item.validity.is_valid)
            .collect::<Vec<_>>();
        let speedups = valid_items
            .iter()
            .filter_map(|item| item.speedup.median_ratio_rg_over_code_indexer)
            .collect::<Vec<_>>();

        by_mode.insert(
            mode.as_str().to_string(),
            ModeSummary {
                total_cases: mode_items.len(),
                valid_cases: valid_items.len(),
                invalid_cases: mode_items.len() - valid_items.len(),
                median_speedup_rg_over_code_indexer: median(&speedups).ok().map(round6),
            },
        );
    }

    RunSummary {
        by_mode,
        selected_case_count,
        repos_without_valid,
    }
}
