//! End-to-end tests for formula compilation, sandboxed execution, and
//! custom scoring conditions.
//!
//! Run with: cargo test formula_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use stackcity::board::{Card, CardId, Cell, Edge, RoadSegment, ZoneType};
use stackcity::engine::{CustomConditionSpec, ScoringEngine};
use stackcity::error::{CompileError, ExecError};
use stackcity::sandbox::{Sandbox, SandboxConfig};
use std::time::{Duration, Instant};

fn sample_board() -> Vec<Card> {
    let roads = Card::new(
        CardId(3),
        0,
        2,
        [
            [
                Cell::with_roads(
                    ZoneType::commercial(),
                    vec![RoadSegment(Edge::Right, Edge::Bottom)],
                ),
                Cell::with_roads(
                    ZoneType::commercial(),
                    vec![RoadSegment(Edge::Left, Edge::Top)],
                ),
            ],
            [
                Cell::new(ZoneType::commercial()),
                Cell::new(ZoneType::commercial()),
            ],
        ],
    );
    vec![
        Card::uniform(CardId(1), 0, 0, &ZoneType::residential()),
        Card::uniform(CardId(2), 2, 0, &ZoneType::park()),
        roads,
    ]
}

#[test]
fn test_formula_scores_board_through_engine() {
    let mut engine = ScoringEngine::default();
    engine
        .add_custom_condition(CustomConditionSpec {
            id: "zone-variety".to_string(),
            name: "Zone Variety".to_string(),
            description: "three points per distinct zone with a cluster".to_string(),
            target_points: 9,
            source: r#"fn calculateScore(ctx) {
                let seen = [];
                let points = 0;
                for c in ctx.clusters() {
                    let new = true;
                    for z in seen { if z == c.zone { new = false; } }
                    if new { seen = seen + [c.zone]; points = points + 3; }
                }
                return points;
            }"#
            .to_string(),
        })
        .expect("registration failed");

    let breakdown = engine.score(&sample_board(), &["zone-variety"]);
    assert_eq!(breakdown.conditions.len(), 1);
    assert_eq!(
        breakdown.conditions[0].points, 9,
        "residential, park, and commercial each have a cluster"
    );
}

#[test]
fn test_denylisted_formula_never_reaches_execution() {
    let engine = ScoringEngine::default();
    let source = r#"fn calculateScore(ctx) {
        let result = eval("1 + 1");
        return result;
    }"#;

    let compiled = engine.check_formula(source);
    assert!(!compiled.ok());
    let Some(CompileError::Forbidden { pattern, line, .. }) = compiled.error else {
        panic!("expected a forbidden-pattern rejection, got {:?}", compiled.error);
    };
    assert_eq!(pattern, "eval");
    assert_eq!(line, 2);

    // The execution path refuses the same source outright.
    let err = engine.execute_formula(source, &sample_board()).unwrap_err();
    assert_eq!(err, ExecError::NotCompiled);
}

#[test]
fn test_spinning_formula_times_out_within_window() {
    let budget_ms = 100;
    let sandbox = Sandbox::new(SandboxConfig {
        time_budget_ms: budget_ms,
        // Fuel high enough that the deadline, not the meter, fires first.
        fuel_budget: u64::MAX / 2,
        ..SandboxConfig::default()
    });
    let analysis = stackcity::analyze(&sample_board());

    let started = Instant::now();
    let err = sandbox
        .execute(
            "fn calculateScore(ctx) { while true { } return 0; }",
            &analysis,
        )
        .unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err, ExecError::Timeout { budget_ms });
    assert!(
        elapsed <= Duration::from_millis(150),
        "caller must be released within 150 ms, took {elapsed:?}"
    );
}

#[test]
fn test_compile_idempotence_across_sandbox() {
    let sandbox = Sandbox::default();
    let source = "fn calculateScore(ctx) { return count(ctx.tiles()); }";
    let first = sandbox.compile(source);
    let second = sandbox.compile(source);
    assert!(first.ok() && second.ok());
    assert_eq!(first.source, second.source);
    assert_eq!(first.diagnostics, second.diagnostics);
}

#[test]
fn test_syntax_error_carries_position() {
    let engine = ScoringEngine::default();
    let compiled = engine.check_formula("fn calculateScore(ctx) {\n  return 1 +;\n}");
    assert!(!compiled.ok());
    let Some(CompileError::Syntax(diagnostic)) = compiled.error else {
        panic!("expected a syntax error");
    };
    assert_eq!(diagnostic.line, 2);
}

#[test]
fn test_result_cache_shared_across_conditions_and_direct_calls() {
    let mut engine = ScoringEngine::default();
    let source = "fn calculateScore(ctx) { return count(ctx.tiles()); }";
    engine
        .add_custom_condition(CustomConditionSpec {
            id: "tile-count".to_string(),
            name: "Tile Count".to_string(),
            description: "one point per visible tile".to_string(),
            target_points: 10,
            source: source.to_string(),
        })
        .expect("registration failed");

    let board = sample_board();
    let breakdown = engine.score(&board, &["tile-count"]);
    assert_eq!(breakdown.conditions[0].points, 12);

    let direct = engine.execute_formula(source, &board).expect("direct run");
    assert_eq!(direct.score, 12);
    assert!(direct.cached, "same source and board must hit the cache");
}

#[test]
fn test_result_cache_never_crosses_distinct_boards() {
    // These two single-card boards once shared a fingerprint because
    // position fields could cancel across bit ranges. The second run must
    // score its own board, not replay the first board's cached result.
    let engine = ScoringEngine::default();
    let source = r"fn calculateScore(ctx) {
        if ctx.tileAt(0, 1) != nil { return 1; }
        return 0;
    }";
    let far = vec![Card::uniform(CardId(7), 1 << 20, 0, &ZoneType::park())];
    let near = vec![Card::uniform(CardId(7), 0, 1, &ZoneType::park())];

    let first = engine.execute_formula(source, &far).expect("far board");
    assert_eq!(first.score, 0);

    let second = engine.execute_formula(source, &near).expect("near board");
    assert_eq!(second.score, 1, "board with a tile at (0,1) scores 1");
    assert!(!second.cached, "distinct boards must not share cache entries");
}

#[test]
fn test_formula_sees_road_networks() {
    let engine = ScoringEngine::default();
    let result = engine
        .execute_formula(
            r"fn calculateScore(ctx) {
                let segments = 0;
                for n in ctx.networks() { segments = segments + n.size; }
                return segments;
            }",
            &sample_board(),
        )
        .expect("execution failed");
    assert_eq!(result.score, 2, "the elbow pair forms one two-segment network");
}

#[test]
fn test_highlights_flow_to_condition_details() {
    let mut engine = ScoringEngine::default();
    engine
        .add_custom_condition(CustomConditionSpec {
            id: "residential-spotter".to_string(),
            name: "Residential Spotter".to_string(),
            description: "highlights every residential tile".to_string(),
            target_points: 4,
            source: r#"fn calculateScore(ctx) {
                let found = 0;
                for t in ctx.tiles() {
                    if t.zone == "residential" {
                        ctx.highlight([t]);
                        found = found + 1;
                    }
                }
                return found;
            }"#
            .to_string(),
        })
        .expect("registration failed");

    let breakdown = engine.score(&sample_board(), &["residential-spotter"]);
    assert_eq!(breakdown.conditions[0].points, 4);
    assert_eq!(breakdown.conditions[0].tiles.len(), 4);
}
