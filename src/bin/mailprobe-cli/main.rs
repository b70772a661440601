mod args;
mod output;

use std::io::{self, BufRead};

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands};
use output::OutputRow;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(cmd) = cli.cmd.as_ref() else {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    };

    let addresses = collect_addresses(&cli, cmd)?;
    let rows: Vec<OutputRow> = match cmd {
        Commands::Syntax { .. } => addresses.iter().map(|a| output::syntax_row(a)).collect(),
        Commands::Check(args) => {
            let options = args.options();
            addresses
                .iter()
                .map(|a| output::check_row(a, args, &options))
                .collect()
        }
    };

    output::write_reports(&rows, &cli)?;

    // codes de sortie : 0 OK, 2 invalids, 3 erreurs de vérification, 1 fatal
    match output::exit_code(&rows) {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}

fn collect_addresses(cli: &Cli, cmd: &Commands) -> Result<Vec<String>> {
    if cli.stdin {
        let mut addresses = Vec::new();
        for line in io::stdin().lock().lines() {
            let line = line.context("read stdin")?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                addresses.push(trimmed.to_string());
            }
        }
        return Ok(addresses);
    }
    match cmd.email() {
        Some(email) => Ok(vec![email.to_string()]),
        None => bail!("missing EMAIL argument (or use --stdin)"),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
