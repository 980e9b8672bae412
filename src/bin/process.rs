// Stage B: per day/agent subtotal report over the cleaned orders.
//
//   process <INPUT> <OUTPUT> [--config FILE] [--stats FILE] [--preview N]
use std::process::ExitCode;

use clap::Parser;
use service_ledger::cli::{self, StageArgs};
use service_ledger::run_process;

#[derive(Parser)]
#[command(name = "process")]
#[command(about = "Group cleaned orders by day and agents, inserting subtotal rows")]
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
    cli::run_stage("process", &parsed.args, |input, output, config| {
        run_process(input, output, config)
    })
}
