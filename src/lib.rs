// Allow unwrap and float comparison in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::float_cmp))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Stackcity: board-topology analysis and sandboxed custom scoring for a
//! tile-stacking city game.
//!
//! The crate has two halves:
//! - A pure analysis core: resolve a stack of placed 2x2 cards into a tile
//!   map under last-placed-wins, detect zone clusters and road networks,
//!   and compute a deterministic base score.
//! - A formula sandbox: compile user-authored scoring formulas to bytecode
//!   and run them fuel-metered, time-bounded, and without host bindings,
//!   so an untrusted formula can never block or crash scoring.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │           Scoring Engine            │
//! │   (registry + sandbox + caches)     │
//! ├──────────────────┬──────────────────┤
//! │   Analysis Core  │  Formula Sandbox │
//! │ clusters / roads │  lexer → parser  │
//! │   base scoring   │  → bytecode VM   │
//! ├──────────────────┴──────────────────┤
//! │            Board Resolver           │
//! │   cards → last-placed-wins tiles    │
//! └─────────────────────────────────────┘
//! ```
//!
//! Everything is deterministic: the same board and conditions always yield
//! the same breakdown, and iteration orders are stable across runs.
//!
//! # Example
//!
//! ```
//! use stackcity::board::{Card, CardId, ZoneType};
//! use stackcity::engine::ScoringEngine;
//!
//! let engine = ScoringEngine::default();
//! let board = vec![Card::uniform(CardId(1), 0, 0, &ZoneType::park())];
//! let breakdown = engine.score(&board, &["park-coverage"]);
//! assert_eq!(breakdown.base.base_score, 4);
//! ```

pub mod analysis;
pub mod board;
pub mod engine;
pub mod error;
pub mod formula;
pub mod sandbox;
pub mod scoring;

pub use analysis::{BoardAnalysis, analyze};
pub use engine::{CustomConditionSpec, ScoringEngine};
pub use error::{CompileError, ExecError};
pub use sandbox::{ExecutionResult, Sandbox, SandboxConfig};
pub use scoring::{ScoreBreakdown, ScoringCondition};
