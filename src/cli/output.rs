//! Output formatting utilities for CLI.

use stackcity::scoring::ScoreBreakdown;

/// Format a score breakdown as human-readable text.
pub(super) fn format_breakdown(breakdown: &ScoreBreakdown) -> String {
    let mut output = String::new();

    output.push_str("Base score\n");
    for (zone, points) in &breakdown.base.cluster_scores {
        output.push_str(&format!("  {:<14} {points}\n", zone.as_str()));
    }
    output.push_str(&format!(
        "  {:<14} {}\n",
        "road penalty", breakdown.base.road_penalty
    ));
    output.push_str(&format!(
        "  {:<14} {}\n",
        "subtotal", breakdown.base.base_score
    ));

    if !breakdown.conditions.is_empty() {
        output.push_str("\nConditions\n");
        for condition in &breakdown.conditions {
            output.push_str(&format!(
                "  {:<24} {:>4}  {}\n",
                condition.name, condition.points, condition.description
            ));
            if let Some(error) = &condition.error {
                output.push_str(&format!("    error: {error}\n"));
            }
        }
    }

    output.push_str(&format!("\nTotal:  {}\n", breakdown.total_score));
    output.push_str(&format!("Target: {}\n", breakdown.target_score));
    output
}
