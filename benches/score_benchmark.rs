//! Benchmarks for board analysis and formula execution.

#![allow(missing_docs)] // Benchmark macros generate undocumented functions

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use stackcity::board::{Card, CardId, Cell, Edge, RoadSegment, ZoneType};
use stackcity::engine::ScoringEngine;
use stackcity::{Sandbox, analyze};

/// A dense board: a diagonal band of overlapping cards with roads.
fn dense_board() -> Vec<Card> {
    let zones = [
        ZoneType::residential(),
        ZoneType::commercial(),
        ZoneType::industrial(),
        ZoneType::park(),
    ];
    (0..64u32)
        .map(|i| {
            let zone = &zones[(i % 4) as usize];
            #[allow(clippy::cast_possible_wrap)]
            let (x, y) = ((i % 8) as i32, (i / 8) as i32);
            let mut card = Card::uniform(CardId(i), x, y, zone);
            if i % 3 == 0 {
                card.cells[0][0] =
                    Cell::with_roads(zone.clone(), vec![RoadSegment(Edge::Top, Edge::Bottom)]);
            }
            card
        })
        .collect()
}

fn bench_analysis(c: &mut Criterion) {
    let board = dense_board();
    c.bench_function("analyze_dense_board", |b| {
        b.iter(|| black_box(analyze(black_box(&board))));
    });
}

fn bench_base_scoring(c: &mut Criterion) {
    let engine = ScoringEngine::default();
    let board = dense_board();
    c.bench_function("score_builtin_conditions", |b| {
        b.iter(|| {
            black_box(engine.score(
                black_box(&board),
                &["residential-district", "park-coverage", "unified-roads"],
            ));
        });
    });
}

fn bench_formula_execution(c: &mut Criterion) {
    let sandbox = Sandbox::default();
    let analysis = analyze(&dense_board());
    let source = r#"fn calculateScore(ctx) {
        let points = 0;
        for t in ctx.tiles() {
            if t.zone == "park" { points = points + 1; }
        }
        for cl in ctx.clusters() { points = points + cl.size; }
        return points;
    }"#;

    c.bench_function("execute_formula_cached", |b| {
        b.iter(|| black_box(sandbox.execute(black_box(source), &analysis)));
    });

    c.bench_function("execute_formula_fresh", |b| {
        b.iter(|| {
            sandbox.clear_caches();
            black_box(sandbox.execute(black_box(source), &analysis))
        });
    });
}

fn bench_compile(c: &mut Criterion) {
    let sandbox = Sandbox::default();
    let source = r#"fn helper(list) { return sum(list); }
    fn calculateScore(ctx) {
        let sizes = [];
        for cl in ctx.clusters() { sizes = sizes + [cl.size]; }
        return helper(sizes);
    }"#;

    c.bench_function("compile_formula", |b| {
        b.iter(|| {
            sandbox.clear_caches();
            black_box(sandbox.compile(black_box(source)))
        });
    });
}

criterion_group!(
    benches,
    bench_analysis,
    bench_base_scoring,
    bench_formula_execution,
    bench_compile
);
criterion_main!(benches);
