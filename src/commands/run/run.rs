use std::path::Path;

use anyhow::Result;
use tracing::{error, info, warn};

use super::aggregate::{Harness, summarize_run};
use super::config::RunConfig;
use super::invoke::{CodeIndexer, CommandRunner, ProcessRunner, RepoIndex, Ripgrep};
use super::measure::{Clock, MonotonicClock};
use super::report::{Provenance, RunDescriptor, build_report, render_markdown};
use crate::cli::RunArgs;
use crate::commands::cases::{group_by_repo, load_cases};
use crate::model::{BenchMode, Case, ResultRecord};
use crate::util::{sha256_file, write_json_pretty, write_text};

/// Exit status when `--require-valid` finds a repo without any valid case.
const EXIT_NO_VALID_CASES: i32 = 2;

pub fn run(args: RunArgs) -> Result<i32> {
    let config = RunConfig::from_args(&args)?;
    let cases = load_cases(&args.cases, config.selected_repos.as_deref())?;
    let cases_sha256 = sha256_file(&args.cases)?;

    info!(
        cases = cases.len(),
        mode = args.mode.as_str(),
        runs = config.plan.runs,
        warmup = config.plan.warmup,
        "starting speed benchmark"
    );

    let indexer = CodeIndexer::new(&args.binary);
    let ripgrep = Ripgrep::new(&args.rg_program);
    let runner = ProcessRunner;
    let clock = MonotonicClock::new();
    let harness = Harness {
        indexer: &indexer,
        ripgrep: &ripgrep,
        runner: &runner,
        clock: &clock,
        plan: config.plan,
    };

    let outcome = execute(&harness, &cases, &config.modes, &args.repos_dir)?;

    let summary = summarize_run(
        &outcome.results,
        &config.modes,
        cases.len(),
        outcome.repos_without_valid.clone(),
    );
    let descriptor = RunDescriptor {
        mode: args.mode.as_str().to_string(),
        runs: config.plan.runs,
        warmup: config.plan.warmup,
        repos: args.repos.clone(),
        project_root: args.project_root.display().to_string(),
        cases_path: args.cases.display().to_string(),
        cases_sha256,
    };
    let provenance = Provenance::collect(&args.project_root, &args.binary, &args.rg_program);
    let report = build_report(descriptor, provenance, cases, outcome.results, summary);

    write_json_pretty(&args.out_json, &report)?;
    write_text(&args.out_md, &render_markdown(&report))?;
    info!(path = %args.out_json.display(), "wrote JSON report");
    info!(path = %args.out_md.display(), "wrote Markdown report");

    let code = exit_code(args.require_valid, &outcome.repos_without_valid);
    if code != 0 {
        error!(
            repos = %outcome.repos_without_valid.join(", "),
            "no valid parity cases for repos"
        );
    }

    Ok(code)
}

/// Process exit status once both reports are on disk.
pub fn exit_code(require_valid: bool, repos_without_valid: &[String]) -> i32 {
    if require_valid && !repos_without_valid.is_empty() {
        EXIT_NO_VALID_CASES
    } else {
        0
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    pub results: Vec<ResultRecord>,
    pub repos_without_valid: Vec<String>,
}

/// Sequential run over every repo, case and mode.
///
/// Each repo's index is built once before its cases, and a repo is finished
/// before the next one is opened. Any fatal error aborts the whole run.
pub fn execute<R, C>(
    harness: &Harness<'_, R, C>,
    cases: &[Case],
    modes: &[BenchMode],
    repos_dir: &Path,
) -> Result<RunOutcome>
where
    R: CommandRunner,
    C: Clock + ?Sized,
{
    let mut results = Vec::with_capacity(cases.len() * modes.len());
    let mut repos_without_valid = Vec::new();

    for (repo, repo_cases) in group_by_repo(cases) {
        let index = RepoIndex::open(repo, repos_dir)?;
        harness.prepare_repo(&index)?;

        let mut repo_has_valid = false;
        for case in repo_cases {
            let parity = harness.check_parity(case, &index)?;
            repo_has_valid |= parity.verdict.is_valid;

            for &mode in modes {
                results.push(harness.evaluate(case, mode, &parity, &index)?);
            }
        }

        if !repo_has_valid {
            warn!(repo = %repo, "repo has no valid parity cases");
            repos_without_valid.push(repo.to_string());
        }
    }

    Ok(RunOutcome {
        results,
        repos_without_valid,
    })
}
