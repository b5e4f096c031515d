use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use std::io::{self, BufRead};

mod args;
mod output;

use args::{Cli, Commands};
use output::OutputRow;

fn init_tracing(cli: &Cli) {
    // RUST_LOG prime sur -v
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);
    let options = cli.verify_options()?;
    let mut rows: Vec<OutputRow> = Vec::new();

    if cli.stdin {
        for line in io::stdin().lock().lines() {
            let email = line.context("read stdin")?;
            rows.push(OutputRow::check(&email, &options));
        }
    } else if let Some(Commands::Verify { email, .. }) = &cli.cmd {
        rows.push(OutputRow::check(email, &options));
    } else {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    }

    output::emit(&rows, &cli)?;

    // codes de sortie : 0 OK, 2 invalids, 1 fatal
    if rows.iter().any(|row| row.error.is_some()) {
        std::process::exit(1);
    }
    if rows.iter().any(|row| !row.is_valid()) {
        std::process::exit(2);
    }
    Ok(())
}
