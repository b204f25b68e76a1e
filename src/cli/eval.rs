//! Formula execution command implementation.

use super::board_file::load_board;
use super::{CliError, OutputFormat};
use serde::Serialize;
use stackcity::board::Coord;
use stackcity::engine::ScoringEngine;
use stackcity::sandbox::SandboxConfig;
use std::fs;
use std::path::Path;

/// JSON-serializable evaluation outcome.
#[derive(Debug, Serialize)]
struct JsonEvalResult {
    score: i64,
    elapsed_ms: u128,
    cached: bool,
    highlights: Vec<Coord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fuel_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    program_ops: Option<usize>,
}

/// Execute the eval command.
///
/// # Errors
///
/// Returns an error if a file cannot be read, the formula fails
/// validation, or execution fails.
pub(crate) fn execute(
    formula: &Path,
    board: &Path,
    time_budget: Option<u64>,
    fuel: Option<u64>,
    debug: bool,
    format: OutputFormat,
) -> Result<(), CliError> {
    let source = fs::read_to_string(formula)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", formula.display())))?;
    let cards = load_board(board)?;

    let defaults = SandboxConfig::default();
    let engine = ScoringEngine::new(SandboxConfig {
        time_budget_ms: time_budget.unwrap_or(defaults.time_budget_ms),
        fuel_budget: fuel.unwrap_or(defaults.fuel_budget),
        ..defaults
    });

    let compiled = engine.check_formula(&source);
    if let Some(error) = compiled.error {
        for diagnostic in &compiled.diagnostics {
            eprintln!("  {diagnostic}");
        }
        return Err(CliError::new(error.to_string()));
    }

    let outcome = if debug {
        let report = engine
            .execute_formula_debug(&source, &cards)
            .map_err(|e| CliError::new(e.to_string()))?;
        JsonEvalResult {
            score: report.result.score,
            elapsed_ms: report.result.elapsed.as_millis(),
            cached: report.result.cached,
            highlights: report.result.highlights,
            fuel_used: Some(report.fuel_used),
            program_ops: Some(report.program_ops),
        }
    } else {
        let result = engine
            .execute_formula(&source, &cards)
            .map_err(|e| CliError::new(e.to_string()))?;
        JsonEvalResult {
            score: result.score,
            elapsed_ms: result.elapsed.as_millis(),
            cached: result.cached,
            highlights: result.highlights,
            fuel_used: None,
            program_ops: None,
        }
    };

    match format {
        OutputFormat::Text => {
            println!("Score:   {}", outcome.score);
            println!("Elapsed: {} ms", outcome.elapsed_ms);
            if !outcome.highlights.is_empty() {
                let coords: Vec<String> = outcome
                    .highlights
                    .iter()
                    .map(|c| format!("({}, {})", c.x, c.y))
                    .collect();
                println!("Highlights: {}", coords.join(" "));
            }
            if let Some(fuel_used) = outcome.fuel_used {
                println!("Fuel used:   {fuel_used}");
            }
            if let Some(program_ops) = outcome.program_ops {
                println!("Program ops: {program_ops}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }
    Ok(())
}
