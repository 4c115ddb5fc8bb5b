use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::CasesArgs;
use crate::error::BenchError;
use crate::model::{Case, CasesFile};

pub fn run(args: CasesArgs) -> Result<()> {
    let selected_repos = parse_repos(&args.repos)?;
    let cases = load_cases(&args.cases, selected_repos.as_deref())?;

    for (repo, repo_cases) in group_by_repo(&cases) {
        let ids = repo_cases
            .iter()
            .map(|case| case.id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        info!(repo = %repo, case_count = repo_cases.len(), cases = %ids, "selected repo");
    }
    info!(
        path = %args.cases.display(),
        selected_case_count = cases.len(),
        "cases file valid"
    );

    Ok(())
}

/// `None` selects every repo.
pub fn parse_repos(raw: &str) -> Result<Option<Vec<String>>, BenchError> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(None);
    }

    let repos = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToOwned::to_owned)
        .collect::<Vec<_>>();
    if repos.is_empty() {
        return Err(BenchError::configuration(
            "--repos must be 'all' or a comma-separated list",
        ));
    }

    Ok(Some(repos))
}

pub fn load_cases(path: &Path, selected_repos: Option<&[String]>) -> Result<Vec<Case>> {
    if !path.exists() {
        return Err(BenchError::MissingResource {
            what: "cases file",
            path: path.to_path_buf(),
        }
        .into());
    }

    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let cases = parse_cases(&raw, selected_repos)
        .with_context(|| format!("failed to load cases from {}", path.display()))?;

    Ok(cases)
}

pub fn parse_cases(raw: &[u8], selected_repos: Option<&[String]>) -> Result<Vec<Case>, BenchError> {
    let payload: CasesFile = serde_json::from_slice(raw).map_err(|err| {
        BenchError::configuration(format!(
            "cases file must contain an array field 'cases' of {{id, repo, symbol, rg_pattern, rg_glob?}}: {err}"
        ))
    })?;

    let mut cases = Vec::with_capacity(payload.cases.len());
    for case in payload.cases {
        validate_case(&case)?;
        let selected = selected_repos
            .map(|repos| repos.iter().any(|repo| repo == &case.repo))
            .unwrap_or(true);
        if selected {
            cases.push(case);
        }
    }

    if cases.is_empty() {
        return Err(BenchError::configuration(
            "no cases selected; check --repos and the cases file",
        ));
    }

    Ok(cases)
}

fn validate_case(case: &Case) -> Result<(), BenchError> {
    let required = [
        ("id", &case.id),
        ("repo", &case.repo),
        ("symbol", &case.symbol),
        ("rg_pattern", &case.rg_pattern),
    ];
    let empty = required
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| *key)
        .collect::<Vec<_>>();

    if empty.is_empty() {
        Ok(())
    } else {
        Err(BenchError::configuration(format!(
            "case '{}' has empty required keys {:?}",
            case.id, empty
        )))
    }
}

/// Repos in name order; cases keep their file order within a repo.
pub fn group_by_repo(cases: &[Case]) -> BTreeMap<&str, Vec<&Case>> {
    let mut grouped = BTreeMap::<&str, Vec<&Case>>::new();
    for case in cases {
        grouped.entry(case.repo.as_str()).or_default().push(case);
    }
    grouped
}
