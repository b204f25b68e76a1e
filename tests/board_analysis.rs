//! Integration tests for board resolution, cluster and road detection,
//! and base scoring.
//!
//! Run with: cargo test board_analysis

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use stackcity::analysis::{analyze, find_clusters, find_road_networks};
use stackcity::board::{
    Card, CardId, Cell, Coord, Edge, RoadSegment, Rotation, ZoneType, board_fingerprint,
    resolve_board,
};
use stackcity::scoring::calculate_base_score;

fn card_with_roads(id: u32, x: i32, y: i32, roads: [Vec<RoadSegment>; 4]) -> Card {
    let [tl, tr, bl, br] = roads;
    Card::new(
        CardId(id),
        x,
        y,
        [
            [
                Cell::with_roads(ZoneType::commercial(), tl),
                Cell::with_roads(ZoneType::commercial(), tr),
            ],
            [
                Cell::with_roads(ZoneType::commercial(), bl),
                Cell::with_roads(ZoneType::commercial(), br),
            ],
        ],
    )
}

#[test]
fn test_full_overlap_keeps_later_card_only() {
    let cards = vec![
        Card::uniform(CardId(1), 0, 0, &ZoneType::residential()),
        Card::uniform(CardId(2), 0, 0, &ZoneType::industrial()),
    ];
    let tiles = resolve_board(&cards);
    assert_eq!(tiles.len(), 4);
    for tile in tiles.iter() {
        assert_eq!(tile.card, CardId(2));
        assert_eq!(tile.zone, ZoneType::industrial());
    }
}

#[test]
fn test_partial_overlap_resolution() {
    // Card B lands one column to the right of card A, covering A's right
    // half. A keeps its left column, B keeps all four cells.
    let cards = vec![
        Card::uniform(CardId(1), 0, 0, &ZoneType::residential()),
        Card::uniform(CardId(2), 1, 0, &ZoneType::industrial()),
    ];
    let tiles = resolve_board(&cards);
    assert_eq!(tiles.len(), 6);

    let clusters = find_clusters(&tiles);
    let residential = clusters
        .iter()
        .find(|c| c.zone == ZoneType::residential())
        .unwrap();
    let industrial = clusters
        .iter()
        .find(|c| c.zone == ZoneType::industrial())
        .unwrap();
    assert_eq!(residential.size(), 2, "left column of card A survives");
    assert_eq!(industrial.size(), 4, "card B is fully visible");
    assert!(residential.contains(Coord::new(0, 0)));
    assert!(residential.contains(Coord::new(0, 1)));
    assert!(!residential.contains(Coord::new(1, 0)));
}

#[test]
fn test_clusters_partition_visible_tiles() {
    let cards = vec![
        Card::uniform(CardId(1), 0, 0, &ZoneType::residential()),
        Card::uniform(CardId(2), 1, 1, &ZoneType::park()),
        Card::uniform(CardId(3), 4, 4, &ZoneType::residential()),
    ];
    let tiles = resolve_board(&cards);
    let clusters = find_clusters(&tiles);

    let total: usize = clusters.iter().map(stackcity::analysis::Cluster::size).sum();
    assert_eq!(total, tiles.len());
    for coord in tiles.coords() {
        let containing = clusters.iter().filter(|c| c.contains(coord)).count();
        assert_eq!(containing, 1, "tile {coord:?} must be in exactly one cluster");
    }
    // The two residential cards are far apart: separate clusters.
    let residential = clusters
        .iter()
        .filter(|c| c.zone == ZoneType::residential())
        .count();
    assert_eq!(residential, 2);
}

#[test]
fn test_parallel_straight_roads_do_not_connect() {
    // Two vertical straights side by side share a boundary, but neither
    // road touches the shared edge. No connection.
    let straight = || vec![RoadSegment(Edge::Top, Edge::Bottom)];
    let card = card_with_roads(1, 0, 0, [straight(), straight(), Vec::new(), Vec::new()]);
    let tiles = resolve_board(&[card]);
    let networks = find_road_networks(&tiles);
    assert_eq!(networks.len(), 2);
    assert!(networks.iter().all(|n| n.size() == 1));
}

#[test]
fn test_facing_edge_roads_connect() {
    // (0,0) exits right, (1,0) enters left: one two-segment network.
    let card = card_with_roads(
        1,
        0,
        0,
        [
            vec![RoadSegment(Edge::Right, Edge::Bottom)],
            vec![RoadSegment(Edge::Left, Edge::Top)],
            Vec::new(),
            Vec::new(),
        ],
    );
    let tiles = resolve_board(&[card]);
    let networks = find_road_networks(&tiles);
    assert_eq!(networks.len(), 1);
    assert_eq!(networks[0].size(), 2);
}

#[test]
fn test_vertical_straights_stack_into_one_network() {
    let straight = || vec![RoadSegment(Edge::Top, Edge::Bottom)];
    let a = card_with_roads(1, 0, 0, [straight(), Vec::new(), straight(), Vec::new()]);
    let b = card_with_roads(2, 0, 2, [straight(), Vec::new(), straight(), Vec::new()]);
    let tiles = resolve_board(&[a, b]);
    let networks = find_road_networks(&tiles);
    assert_eq!(networks.len(), 1);
    assert_eq!(networks[0].size(), 4);
}

#[test]
fn test_rotation_flips_road_segments() {
    // A top-right elbow in the top-left cell; under 180 degrees it lands
    // in the bottom-right cell as a bottom-left elbow.
    let card = card_with_roads(
        1,
        0,
        0,
        [
            vec![RoadSegment(Edge::Top, Edge::Right)],
            Vec::new(),
            Vec::new(),
            Vec::new(),
        ],
    )
    .rotated(Rotation::R180);
    let tiles = resolve_board(&[card]);

    let elbow = tiles.get(Coord::new(1, 1)).unwrap();
    assert_eq!(elbow.roads, vec![RoadSegment(Edge::Bottom, Edge::Left)]);
    assert!(tiles.get(Coord::new(0, 0)).unwrap().roads.is_empty());
}

#[test]
fn test_base_score_combines_clusters_and_road_penalty() {
    // Largest residential cluster 4, largest park cluster 4, two separate
    // one-segment networks penalize 2.
    let straight = || vec![RoadSegment(Edge::Top, Edge::Bottom)];
    let roads = Card::new(
        CardId(3),
        10,
        10,
        [
            [
                Cell::with_roads(ZoneType::residential(), straight()),
                Cell::with_roads(ZoneType::residential(), straight()),
            ],
            [
                Cell::new(ZoneType::residential()),
                Cell::new(ZoneType::residential()),
            ],
        ],
    );
    let cards = vec![
        Card::uniform(CardId(1), 0, 0, &ZoneType::residential()),
        Card::uniform(CardId(2), 2, 0, &ZoneType::park()),
        roads,
    ];
    let analysis = analyze(&cards);
    let base = calculate_base_score(&analysis);

    assert_eq!(base.cluster_scores[&ZoneType::residential()], 4);
    assert_eq!(base.cluster_scores[&ZoneType::park()], 4);
    assert_eq!(base.road_penalty, -2);
    assert_eq!(base.base_score, 4 + 4 - 2);
}

#[test]
fn test_empty_board_analysis() {
    let analysis = analyze(&[]);
    assert!(analysis.tiles.is_empty());
    assert!(analysis.clusters.is_empty());
    assert!(analysis.networks.is_empty());
    let base = calculate_base_score(&analysis);
    assert_eq!(base.base_score, 0);
    assert!(base.cluster_scores.is_empty());
}

#[test]
fn test_fingerprint_is_order_sensitive() {
    let a = Card::uniform(CardId(1), 0, 0, &ZoneType::residential());
    let b = Card::uniform(CardId(2), 0, 0, &ZoneType::park());

    let ab = board_fingerprint(&[a.clone(), b.clone()]);
    let ba = board_fingerprint(&[b, a]);
    // Placement order decides which card wins the overlap, so the
    // fingerprint must distinguish the two boards.
    assert_ne!(ab, ba);
}

#[test]
fn test_analysis_matches_piecewise_calls() {
    let cards = vec![
        Card::uniform(CardId(1), 0, 0, &ZoneType::residential()),
        Card::uniform(CardId(2), 1, 0, &ZoneType::industrial()),
    ];
    let analysis = analyze(&cards);
    let tiles = resolve_board(&cards);

    assert_eq!(analysis.tiles.len(), tiles.len());
    assert_eq!(analysis.clusters, find_clusters(&tiles));
    assert_eq!(analysis.networks, find_road_networks(&tiles));
    assert_eq!(analysis.fingerprint, board_fingerprint(&cards));
}
