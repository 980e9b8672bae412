// Stage A: filter completed orders and derive the prepaid surcharge columns.
//
//   clean <INPUT> <OUTPUT> [--config FILE] [--stats FILE] [--preview N]
use std::process::ExitCode;

use clap::Parser;
use service_ledger::cli::{self, StageArgs};
use service_ledger::run_clean;

#[derive(Parser)]
#[command(name = "clean")]
#[command(about = "Filter completed service orders and add prepaid fee columns")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    args: StageArgs,
}

fn main() -> ExitCode {
    let parsed = match cli::parse_or_usage::<Cli>() {
        Ok(parsed) => parsed,
        Err(code) => return code,
    };
    cli::run_stage("clean", &parsed.args, |input, output, config| {
        run_clean(input, output, config)
    })
}
