use anyhow::Result;

use super::measure::MeasurePlan;
use crate::cli::RunArgs;
use crate::commands::cases::parse_repos;
use crate::error::BenchError;
use crate::model::BenchMode;

/// Run parameters after validation. Building one performs no tool
/// invocation, so every configuration error surfaces before any work starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub plan: MeasurePlan,
    pub modes: Vec<BenchMode>,
    pub selected_repos: Option<Vec<String>>,
}

impl RunConfig {
    pub fn from_args(args: &RunArgs) -> Result<Self> {
        let plan = MeasurePlan::new(args.warmup, args.runs)?;
        let selected_repos = parse_repos(&args.repos)?;

        if !args.binary.exists() {
            return Err(BenchError::MissingResource {
                what: "code-indexer binary",
                path: args.binary.clone(),
            }
            .into());
        }

        Ok(Self {
            plan,
            modes: args.mode.modes(),
            selected_repos,
        })
    }
}
