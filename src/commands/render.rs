use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::RenderArgs;
use crate::commands::run::render_markdown;
use crate::model::SpeedReport;
use crate::util::write_text;

pub fn run(args: RenderArgs) -> Result<()> {
    let raw = fs::read(&args.report)
        .with_context(|| format!("failed to read {}", args.report.display()))?;
    let report: SpeedReport = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", args.report.display()))?;

    let out_md = args
        .out_md
        .unwrap_or_else(|| args.report.with_extension("md"));
    write_text(&out_md, &render_markdown(&report))?;

    info!(
        report = %args.report.display(),
        results = report.results.len(),
        path = %out_md.display(),
        "rendered Markdown report"
    );

    Ok(())
}
