//! libstage CLI

use anyhow::Result;
use clap::Parser;
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use libstage::util::{Shell, StageError};

/// Lines of captured tool output shown after a failed command.
const STDERR_TAIL_LINES: usize = 20;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        if let Some(stage) = e.downcast_ref::<StageError>() {
            if let Some(tail) = stage.stderr_tail(STDERR_TAIL_LINES) {
                eprintln!("\n{}\n", tail);
            }
            if let Some(help) = stage.help() {
                eprintln!("help: {}", help);
            }
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = match std::env::var("LIBSTAGE_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) if cli.verbose => EnvFilter::new("libstage=debug"),
        Err(_) if cli.quiet => EnvFilter::new("libstage=warn"),
        Err(_) => EnvFilter::new("libstage=info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color);

    match cli.command {
        Commands::Install(args) => commands::install::execute(args, &shell),
        Commands::Doctor(args) => commands::doctor::execute(args, cli.verbose),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
