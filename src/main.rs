//! Stackcity CLI - score boards and work with custom scoring formulas.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

/// Stackcity - board analysis and sandboxed custom scoring
#[derive(Parser, Debug)]
#[command(name = "stackcity")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a board file with built-in and custom conditions
    Score {
        /// Board JSON file
        #[arg(required = true)]
        board: std::path::PathBuf,

        /// Active condition ids (default: all built-ins)
        #[arg(short, long, value_delimiter = ',')]
        conditions: Vec<String>,

        /// JSON file with custom condition definitions
        #[arg(long)]
        custom: Option<std::path::PathBuf>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Validate a formula without executing it
    Check {
        /// Formula source file
        #[arg(required = true)]
        formula: std::path::PathBuf,
    },

    /// Execute a formula against a board
    Eval {
        /// Formula source file
        #[arg(required = true)]
        formula: std::path::PathBuf,

        /// Board JSON file
        #[arg(required = true)]
        board: std::path::PathBuf,

        /// Wall-clock budget in milliseconds (default: 100)
        #[arg(long)]
        time_budget: Option<u64>,

        /// VM fuel budget (default: 2000000)
        #[arg(long)]
        fuel: Option<u64>,

        /// Report fuel usage and program size
        #[arg(short, long)]
        debug: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = match args.command {
        Commands::Score {
            board,
            conditions,
            custom,
            format,
        } => cli::score::execute(&board, &conditions, custom.as_deref(), format),

        Commands::Check { formula } => cli::check::execute(&formula),

        Commands::Eval {
            formula,
            board,
            time_budget,
            fuel,
            debug,
            format,
        } => cli::eval::execute(&formula, &board, time_budget, fuel, debug, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
