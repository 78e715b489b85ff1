//! SV annotation worker main executable.

pub mod annotate;
pub mod common;
pub mod err;

use clap::{Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Annotate structural variants against a reference database",
    long_about = "Matches query structural variants against a catalogued database \
                  and, optionally, reports nearby gene features."
)]
struct Cli {
    /// Commonly used arguments.
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run.
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Annotate query SVs against a database.
    Annotate(annotate::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Annotate(args) => annotate::run(&cli.common, args)?,
        }
        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
