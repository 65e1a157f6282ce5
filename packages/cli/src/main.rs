mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    check, init, menu, outline, schema, CheckArgs, InitArgs, MenuArgs, OutlineArgs, SchemaArgs,
};
use tracing_subscriber::EnvFilter;

/// Reprose CLI - inspect editor configurations and documents
#[derive(Parser, Debug)]
#[command(name = "reprose")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log editor activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a reprose.config.json
    Init(InitArgs),

    /// Print the schema aggregated from the configured features
    Schema(SchemaArgs),

    /// List the merged menu, optionally evaluated against a document
    Menu(MenuArgs),

    /// Validate a document and its links
    Check(CheckArgs),

    /// Print the section outline of a document
    Outline(OutlineArgs),
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| match cli.command {
            Command::Init(args) => init(args, &cwd),
            Command::Schema(args) => schema(args, &cwd),
            Command::Menu(args) => menu(args, &cwd),
            Command::Check(args) => check(args, &cwd),
            Command::Outline(args) => outline(args, &cwd),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
