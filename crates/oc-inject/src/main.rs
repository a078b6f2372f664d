//! oc-inject CLI - run a local executable inside a running container

use std::process::ExitCode;

use clap::Parser;

use oc_inject::commands;
use oc_inject::error::status_byte;
use oc_inject::logging::{LogConfig, LogLevel};

/// oc-inject - copy an executable and its libraries into a pod and run it
#[derive(Debug, Parser)]
#[command(name = "oc-inject")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v manifest, -vv commands, -vvv linker output)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    args: commands::inject::InjectArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log = LogConfig::new(LogLevel::from_occurrences(cli.verbose), cli.args.dry_run);
    log.init();

    match commands::inject::run(cli.args, log) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(status) => ExitCode::from(status_byte(status)),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code)
        }
    }
}
