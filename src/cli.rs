use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::BenchMode;

#[derive(Parser, Debug)]
#[command(
    name = "speedbench",
    version,
    about = "Correctness-gated speed benchmark for code-indexer vs ripgrep"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run parity checks and timed measurements, then write the reports.
    Run(RunArgs),
    /// Load and validate the cases file without invoking any tool.
    Cases(CasesArgs),
    /// Re-render the Markdown report from an existing JSON report.
    Render(RenderArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Comma-separated repo names from the cases file, or `all`.
    #[arg(long, default_value = "all")]
    pub repos: String,

    #[arg(long, value_enum, default_value_t = ModeSelection::Both)]
    pub mode: ModeSelection,

    /// Measured runs per side.
    #[arg(long, default_value_t = 10)]
    pub runs: u32,

    /// Warmup runs per side.
    #[arg(long, default_value_t = 3)]
    pub warmup: u32,

    #[arg(long, default_value = "benches/speed/cases.json")]
    pub cases: PathBuf,

    #[arg(long, default_value = "benches/repos")]
    pub repos_dir: PathBuf,

    /// Path to the code-indexer binary.
    #[arg(long, default_value = "target/release/code-indexer")]
    pub binary: PathBuf,

    /// Ripgrep executable, resolved through PATH when not absolute.
    #[arg(long = "rg", default_value = "rg")]
    pub rg_program: String,

    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,

    #[arg(long, default_value = "benches/results/speed/latest.json")]
    pub out_json: PathBuf,

    #[arg(long, default_value = "benches/results/speed/latest.md")]
    pub out_md: PathBuf,

    /// Exit with status 2 if any selected repo has zero valid cases.
    #[arg(long, default_value_t = false)]
    pub require_valid: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CasesArgs {
    #[arg(long, default_value = "benches/speed/cases.json")]
    pub cases: PathBuf,

    #[arg(long, default_value = "all")]
    pub repos: String,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[arg(long, default_value = "benches/results/speed/latest.json")]
    pub report: PathBuf,

    /// Defaults to the report path with an `.md` extension.
    #[arg(long)]
    pub out_md: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModeSelection {
    QueryOnly,
    FirstRun,
    Both,
}

impl ModeSelection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QueryOnly => "query-only",
            Self::FirstRun => "first-run",
            Self::Both => "both",
        }
    }

    pub fn modes(self) -> Vec<BenchMode> {
        match self {
            Self::QueryOnly => vec![BenchMode::QueryOnly],
            Self::FirstRun => vec![BenchMode::FirstRun],
            Self::Both => vec![BenchMode::QueryOnly, BenchMode::FirstRun],
        }
    }
}
