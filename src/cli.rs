// Argument handling and the run/report wrapper both binaries share.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{Args, Parser};
use serde::Serialize;
use tabled::Tabled;
use tracing::error;

use crate::config::PipelineConfig;
use crate::error::{PipelineResult, USAGE_EXIT_CODE};
use crate::{loader, logging, output};

#[derive(Args, Debug, Clone)]
pub struct StageArgs {
    /// CSV file to read
    pub input: PathBuf,
    /// CSV file to write
    pub output: PathBuf,
    /// TOML file overriding the built-in columns, fees and formats
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Also write run statistics as JSON to this path
    #[arg(long)]
    pub stats: Option<PathBuf>,
    /// Print the first N rows of the written table
    #[arg(long, value_name = "N")]
    pub preview: Option<usize>,
    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse the command line. Help and version requests exit normally; any
/// other problem is a usage error reported with exit code 1.
pub fn parse_or_usage<P: Parser>() -> Result<P, ExitCode> {
    match P::try_parse() {
        Ok(cli) => Ok(cli),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            Err(ExitCode::SUCCESS)
        }
        Err(e) => {
            let _ = e.print();
            Err(ExitCode::from(USAGE_EXIT_CODE))
        }
    }
}

/// Run one stage end to end and turn its outcome into an exit code.
///
/// `stage` prefixes every diagnostic so a failing pipeline names the step
/// that broke.
pub fn run_stage<S, F>(stage: &str, args: &StageArgs, run: F) -> ExitCode
where
    S: Serialize + Tabled,
    F: FnOnce(&Path, &Path, &PipelineConfig) -> PipelineResult<S>,
{
    logging::init(args.verbose);
    match execute(args, run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(stage, error = %e, "stage failed");
            eprintln!("{stage}: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn execute<S, F>(args: &StageArgs, run: F) -> PipelineResult<()>
where
    S: Serialize + Tabled,
    F: FnOnce(&Path, &Path, &PipelineConfig) -> PipelineResult<S>,
{
    let config = PipelineConfig::load(args.config.as_deref())?;
    let stats = run(&args.input, &args.output, &config)?;
    if let Some(path) = &args.stats {
        output::write_json(path, &stats)?;
    }
    if let Some(n) = args.preview {
        let written = loader::load_table(&args.output)?;
        output::preview_table(&written, n);
        output::print_stats(stats);
    }
    Ok(())
}
