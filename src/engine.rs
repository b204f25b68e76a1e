//! The scoring engine facade.
//!
//! One engine instance owns a condition registry and a formula sandbox.
//! There is no process-wide instance; callers construct an engine and
//! pass it where scoring is needed.

use crate::analysis::{BoardAnalysis, analyze};
use crate::board::Card;
use crate::error::CompileError;
use crate::formula::CompiledFormula;
use crate::sandbox::{CacheStats, DebugReport, ExecutionResult, Sandbox, SandboxConfig};
use crate::scoring::{
    BaseScore, ConditionDetails, ConditionRegistry, ScoreBreakdown, ScoringCondition,
    calculate_base_score, score_with_conditions,
};
use rayon::prelude::*;
use std::sync::Arc;

/// Identity and source for a user-authored condition.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CustomConditionSpec {
    /// Stable identifier used to activate the condition.
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the condition rewards, in prose.
    pub description: String,
    /// Declared target contribution, a balance reference only.
    pub target_points: i64,
    /// Formula source text. Stored verbatim; opaque to the engine until
    /// compiled.
    pub source: String,
}

/// Board analysis and scoring with built-in and custom conditions.
#[derive(Debug)]
pub struct ScoringEngine {
    registry: ConditionRegistry,
    sandbox: Arc<Sandbox>,
}

impl ScoringEngine {
    /// Engine with built-in conditions and the given sandbox limits.
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            registry: ConditionRegistry::with_builtins(),
            sandbox: Arc::new(Sandbox::new(config)),
        }
    }

    /// Resolve and analyze a board.
    #[must_use]
    pub fn analyze_board(&self, cards: &[Card]) -> BoardAnalysis {
        analyze(cards)
    }

    /// The deterministic base score of a board.
    #[must_use]
    pub fn base_score(&self, cards: &[Card]) -> BaseScore {
        calculate_base_score(&analyze(cards))
    }

    /// Score a board under the named active conditions.
    #[must_use]
    pub fn score(&self, cards: &[Card], active: &[&str]) -> ScoreBreakdown {
        score_with_conditions(&self.registry, &analyze(cards), active)
    }

    /// Score many boards in parallel under the same active conditions.
    ///
    /// Output order matches input order.
    #[must_use]
    pub fn score_boards(&self, boards: &[Vec<Card>], active: &[&str]) -> Vec<ScoreBreakdown> {
        boards
            .par_iter()
            .map(|cards| self.score(cards, active))
            .collect()
    }

    /// Register a native condition, replacing any condition with its id.
    pub fn register_condition(&mut self, condition: Arc<dyn ScoringCondition>) {
        self.registry.register(condition);
    }

    /// Compile and register a user-authored condition.
    ///
    /// The formula is validated now, at registration time, so bad source
    /// is reported to its author immediately instead of at scoring time.
    ///
    /// # Errors
    ///
    /// Returns the compile error for source that fails validation; the
    /// registry is unchanged then.
    pub fn add_custom_condition(&mut self, spec: CustomConditionSpec) -> Result<(), CompileError> {
        let compiled = self.sandbox.compile(&spec.source);
        if let Some(error) = compiled.error {
            return Err(error);
        }
        self.registry.register(Arc::new(CustomCondition {
            spec,
            sandbox: Arc::clone(&self.sandbox),
        }));
        Ok(())
    }

    /// Validate formula source without registering anything.
    #[must_use]
    pub fn check_formula(&self, source: &str) -> CompiledFormula {
        self.sandbox.compile(source)
    }

    /// Execute formula source against a board, outside any condition.
    ///
    /// # Errors
    ///
    /// Returns the compile, trap, timeout, or worker failure.
    pub fn execute_formula(
        &self,
        source: &str,
        cards: &[Card],
    ) -> Result<ExecutionResult, crate::error::ExecError> {
        self.sandbox.execute(source, &analyze(cards))
    }

    /// Execute formula source with VM internals reported.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ScoringEngine::execute_formula`].
    pub fn execute_formula_debug(
        &self,
        source: &str,
        cards: &[Card],
    ) -> Result<DebugReport, crate::error::ExecError> {
        self.sandbox.execute_debug(source, &analyze(cards))
    }

    /// Ids of every registered condition, in registration order.
    pub fn condition_ids(&self) -> impl Iterator<Item = &str> {
        self.registry.iter().map(|c| c.id())
    }

    /// Current sandbox cache occupancy and hit counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.sandbox.cache_stats()
    }

    /// Drop all cached formulas and results.
    pub fn clear_caches(&self) {
        self.sandbox.clear_caches();
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

/// A registered condition backed by a sandboxed formula.
///
/// A failing execution degrades to zero points plus an error message; it
/// never halts scoring.
struct CustomCondition {
    spec: CustomConditionSpec,
    sandbox: Arc<Sandbox>,
}

impl ScoringCondition for CustomCondition {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn target_points(&self) -> i64 {
        self.spec.target_points
    }

    fn evaluate(&self, analysis: &BoardAnalysis) -> i64 {
        self.sandbox
            .execute(&self.spec.source, analysis)
            .map_or(0, |result| result.score)
    }

    fn evaluate_with_details(&self, analysis: &BoardAnalysis) -> ConditionDetails {
        match self.sandbox.execute(&self.spec.source, analysis) {
            Ok(result) => ConditionDetails {
                points: result.score,
                tiles: result.highlights,
                description: self.spec.description.clone(),
                error: None,
            },
            Err(error) => ConditionDetails {
                points: 0,
                tiles: Vec::new(),
                description: self.spec.description.clone(),
                error: Some(error.to_string()),
            },
        }
    }
}
