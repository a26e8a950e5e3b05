// crates/cli/src/main.rs
//! `guild-sweep` binary.
//!
//! Sweeps a simulated target described by a JSON fixture, showing live
//! progress on a spinner and printing a summary when the job ends.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use guild_sweep_cli::commands::{self, RunArgs};
use guild_sweep_cli::{summary, SpinnerSink};
use guild_sweep_core::JobId;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "guild-sweep", version, about = "Bounded concurrent cleanup of a server's resources")]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log more (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sweep every category of a target
    Run(RunArgs),
    /// Show persisted counters for a target
    Status {
        #[arg(long)]
        target: JobId,
    },
    /// Clear persisted state for a target
    Reset {
        #[arg(long)]
        target: JobId,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,guild_sweep_jobs=info,guild_sweep_cli=info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => {
            let spinner = if args.json {
                SpinnerSink::hidden()
            } else {
                eprintln!("\n\u{1f9f9} guild-sweep v{}\n", env!("CARGO_PKG_VERSION"));
                SpinnerSink::new()
            };
            let report = commands::run(&config, &args, Arc::new(spinner)).await?;
            if args.json {
                println!("{}", summary::render_report_json(&report)?);
            } else {
                print!("{}", summary::render_report(&report));
            }
        }
        Command::Status { target } => match commands::status(&config, target)? {
            Some(state) => print!("{}", summary::render_persisted(&state)),
            None => println!("No sweep state recorded for target {target}"),
        },
        Command::Reset { target } => {
            commands::reset(&config, target)?;
            eprintln!("  \u{2713} Cleared state for target {target}");
        }
    }
    Ok(())
}
