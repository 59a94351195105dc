use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use ipa_remote::{cli, logging};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let args = cli::Args::parse();
    logging::init(logging::Verbosity::from_flags(args.verbose, args.quiet));

    let env = args.resolve_env().context("Invalid arguments")?;

    if cli::run(&args.command, &env)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
