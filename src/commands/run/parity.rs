use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

use super::invoke::{
    CODE_INDEXER_ALLOWED_STATUSES, CodeIndexer, CommandRunner, RG_ALLOWED_STATUSES, RepoIndex,
    Ripgrep,
};
use crate::model::{Case, CaseCounts, ToolCommands, ValidityVerdict};

/// Untimed correctness check for one case, shared by every mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ParityCheck {
    pub counts: CaseCounts,
    pub verdict: ValidityVerdict,
    pub commands: ToolCommands,
}

pub fn check_parity(
    case: &Case,
    index: &RepoIndex,
    indexer: &CodeIndexer,
    ripgrep: &Ripgrep,
    runner: &impl CommandRunner,
) -> Result<ParityCheck> {
    let code_invocation = indexer.definition_invocation(index, &case.symbol);
    let code_output = runner.capture(&code_invocation, CODE_INDEXER_ALLOWED_STATUSES)?;
    let code_count = count_definitions(&code_output.stdout, &case.symbol)
        .with_context(|| format!("failed to count definitions for case {}", case.id))?;

    let rg_invocation = ripgrep.search_invocation(&case.rg_pattern, case.glob(), index.repo_path());
    let rg_output = runner.capture(&rg_invocation, RG_ALLOWED_STATUSES)?;
    // Status 1 is ripgrep's "no matches", which is a valid zero count.
    let rg_count = if rg_output.status == 1 {
        0
    } else {
        count_nonblank_lines(&rg_output.stdout)
    };

    let counts = CaseCounts {
        code_indexer: code_count,
        rg: rg_count,
    };
    let verdict = ValidityVerdict::from_counts(counts);
    if verdict.is_valid {
        info!(case = %case.id, count = code_count, "parity ok");
    } else {
        warn!(
            case = %case.id,
            code_indexer = code_count,
            rg = rg_count,
            "parity mismatch; case will not be timed"
        );
    }

    Ok(ParityCheck {
        counts,
        verdict,
        commands: ToolCommands {
            code_indexer: code_invocation.render(),
            rg: rg_invocation.render(),
        },
    })
}

/// Lines of `definition` output that start with `<symbol> (`.
pub fn count_definitions(stdout: &str, symbol: &str) -> Result<usize> {
    let pattern = Regex::new(&format!(r"^{}\s+\(", regex::escape(symbol)))
        .context("failed to compile definition regex")?;
    Ok(stdout.lines().filter(|line| pattern.is_match(line)).count())
}

pub fn count_nonblank_lines(stdout: &str) -> usize {
    stdout.lines().filter(|line| !line.trim().is_empty()).count()
}
