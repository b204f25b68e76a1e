//! Formula validation command implementation.

use super::CliError;
use stackcity::engine::ScoringEngine;
use std::fs;
use std::path::Path;

/// Execute the check command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the formula fails
/// validation.
pub(crate) fn execute(formula: &Path) -> Result<(), CliError> {
    let source = fs::read_to_string(formula)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", formula.display())))?;

    let engine = ScoringEngine::default();
    let compiled = engine.check_formula(&source);

    println!("Checking: {}", formula.display());
    if compiled.ok() {
        println!("OK");
        return Ok(());
    }

    for diagnostic in &compiled.diagnostics {
        println!("  {diagnostic}");
    }
    match compiled.error {
        Some(error) => Err(CliError::new(error.to_string())),
        None => Err(CliError::new("formula is not executable")),
    }
}
