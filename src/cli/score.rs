//! Score command implementation.

use super::board_file::load_board;
use super::{CliError, OutputFormat, output};
use stackcity::engine::{CustomConditionSpec, ScoringEngine};
use stackcity::sandbox::SandboxConfig;
use std::fs;
use std::path::Path;

/// Execute the score command.
///
/// # Errors
///
/// Returns an error if a file cannot be read or a custom condition fails
/// to compile.
pub(crate) fn execute(
    board: &Path,
    conditions: &[String],
    custom: Option<&Path>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let cards = load_board(board)?;
    let mut engine = ScoringEngine::new(SandboxConfig::default());

    if let Some(path) = custom {
        let text = fs::read_to_string(path)
            .map_err(|e| CliError::new(format!("Failed to read {}: {e}", path.display())))?;
        let specs: Vec<CustomConditionSpec> = serde_json::from_str(&text)
            .map_err(|e| CliError::new(format!("Invalid condition file {}: {e}", path.display())))?;
        for spec in specs {
            let id = spec.id.clone();
            engine
                .add_custom_condition(spec)
                .map_err(|e| CliError::new(format!("Condition '{id}' rejected: {e}")))?;
        }
    }

    let active: Vec<String> = if conditions.is_empty() {
        engine.condition_ids().map(str::to_string).collect()
    } else {
        for id in conditions {
            if !engine.condition_ids().any(|known| known == id) {
                eprintln!("Warning: unknown condition '{id}' will be skipped");
            }
        }
        conditions.to_vec()
    };
    let active: Vec<&str> = active.iter().map(String::as_str).collect();

    let breakdown = engine.score(&cards, &active);
    match format {
        OutputFormat::Text => print!("{}", output::format_breakdown(&breakdown)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&breakdown)?),
    }
    Ok(())
}
