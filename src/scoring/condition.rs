//! The scoring condition contract.

use crate::analysis::BoardAnalysis;
use crate::board::Coord;

/// What a condition reports when asked to explain itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionDetails {
    /// Points awarded. Must equal `evaluate` for the same board.
    pub points: i64,
    /// Tiles that explain the award, for UI highlighting.
    pub tiles: Vec<Coord>,
    /// Human-readable explanation.
    pub description: String,
    /// Error message when a custom formula failed; points are 0 then.
    pub error: Option<String>,
}

impl ConditionDetails {
    /// Details for a board where the condition awards nothing.
    #[must_use]
    pub fn empty(description: impl Into<String>) -> Self {
        Self {
            points: 0,
            tiles: Vec::new(),
            description: description.into(),
            error: None,
        }
    }
}

/// A named rule producing a point value from an analyzed board.
///
/// Built-in conditions are pure native functions; custom conditions route
/// through the formula sandbox. Both honor the same contract:
/// `evaluate_with_details(board).points == evaluate(board)` for every
/// board, including the empty one (0 points, no tiles).
///
/// Whether negative scores are clamped to zero is per-condition policy;
/// the trait itself allows any integer.
pub trait ScoringCondition: Send + Sync {
    /// Stable identifier used to activate the condition.
    fn id(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// What the condition rewards, in prose.
    fn description(&self) -> &str;

    /// Expected point contribution, used to size a game's target score.
    /// A balance reference only, never enforced.
    fn target_points(&self) -> i64;

    /// Score the condition against an analyzed board.
    fn evaluate(&self, analysis: &BoardAnalysis) -> i64;

    /// Score with explanatory tiles. The default produces no highlights;
    /// conditions that can explain themselves override this.
    fn evaluate_with_details(&self, analysis: &BoardAnalysis) -> ConditionDetails {
        ConditionDetails {
            points: self.evaluate(analysis),
            tiles: Vec::new(),
            description: self.description().to_string(),
            error: None,
        }
    }
}

impl std::fmt::Debug for dyn ScoringCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringCondition")
            .field("id", &self.id())
            .field("target_points", &self.target_points())
            .finish_non_exhaustive()
    }
}
