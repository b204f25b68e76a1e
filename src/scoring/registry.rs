//! The scoring condition registry and full-score combination.

use crate::analysis::BoardAnalysis;
use crate::board::Coord;
use crate::scoring::base::{BaseScore, calculate_base_score};
use crate::scoring::builtin::builtin_conditions;
use crate::scoring::condition::ScoringCondition;
use std::sync::Arc;

/// Holds the conditions a game can activate, built-in and custom alike.
///
/// An explicit value owned by the caller (usually via the engine); there is
/// no process-wide registry.
#[derive(Debug, Default)]
pub struct ConditionRegistry {
    conditions: Vec<Arc<dyn ScoringCondition>>,
}

impl ConditionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in conditions.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self {
            conditions: builtin_conditions(),
        }
    }

    /// Register a condition. A condition with the same id replaces the
    /// existing entry.
    pub fn register(&mut self, condition: Arc<dyn ScoringCondition>) {
        if let Some(existing) = self
            .conditions
            .iter_mut()
            .find(|c| c.id() == condition.id())
        {
            *existing = condition;
        } else {
            self.conditions.push(condition);
        }
    }

    /// Look up a condition by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn ScoringCondition>> {
        self.conditions.iter().find(|c| c.id() == id)
    }

    /// Iterate all registered conditions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ScoringCondition>> {
        self.conditions.iter()
    }

    /// Number of registered conditions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether no conditions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// One condition's contribution within a full score.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConditionScore {
    /// Condition identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Points contributed. Zero when the condition failed.
    pub points: i64,
    /// Explanatory tiles for highlighting.
    pub tiles: Vec<Coord>,
    /// Explanation or failure message.
    pub description: String,
    /// Error message when a custom formula failed.
    pub error: Option<String>,
}

/// The full score of a board: base score plus active conditions.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScoreBreakdown {
    /// The deterministic base score.
    pub base: BaseScore,
    /// Per-condition contributions, in activation order.
    pub conditions: Vec<ConditionScore>,
    /// Base score plus all condition points.
    pub total_score: i64,
    /// Sum of active conditions' declared target contributions. A balance
    /// reference for the surrounding game, never enforced.
    pub target_score: i64,
}

/// Combine the base score with the named active conditions.
///
/// Unknown ids are skipped: the deck layer owns id validity and a stale id
/// must not break scoring. A failing condition contributes zero points and
/// its error message, never a halt.
#[must_use]
pub fn score_with_conditions(
    registry: &ConditionRegistry,
    analysis: &BoardAnalysis,
    active: &[&str],
) -> ScoreBreakdown {
    let base = calculate_base_score(analysis);
    let mut conditions = Vec::with_capacity(active.len());
    let mut target_score = 0i64;

    for id in active {
        let Some(condition) = registry.get(id) else {
            continue;
        };
        let details = condition.evaluate_with_details(analysis);
        target_score += condition.target_points();
        conditions.push(ConditionScore {
            id: condition.id().to_string(),
            name: condition.name().to_string(),
            points: details.points,
            tiles: details.tiles,
            description: details.description,
            error: details.error,
        });
    }

    let total_score = base.base_score + conditions.iter().map(|c| c.points).sum::<i64>();
    ScoreBreakdown {
        base,
        conditions,
        total_score,
        target_score,
    }
}
