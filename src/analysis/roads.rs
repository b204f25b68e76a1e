//! Road segment graph detection.

use crate::board::{CardId, Coord, RoadSegment, TileMap};
use std::collections::HashMap;

/// One road segment drawn on a visible tile, tagged with its identity.
///
/// The identity key (owning card, world coordinate, edge pair) distinguishes
/// multiple segments within the same cell: a multi-way junction contributes
/// one node per segment to the connectivity graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentRef {
    /// World coordinate of the tile carrying the segment.
    pub coord: Coord,
    /// The segment's edge pair.
    pub segment: RoadSegment,
    /// Card that owns the visible tile.
    pub card: CardId,
}

/// A maximal connected set of road segments across tile boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoadNetwork {
    /// Member segments, sorted by (coordinate, edge pair).
    pub segments: Vec<SegmentRef>,
}

impl RoadNetwork {
    /// Number of segments in the network.
    #[must_use]
    pub fn size(&self) -> usize {
        self.segments.len()
    }

    /// Coordinates covered by this network, deduplicated and sorted.
    #[must_use]
    pub fn coords(&self) -> Vec<Coord> {
        let mut coords: Vec<Coord> = self.segments.iter().map(|s| s.coord).collect();
        coords.sort_unstable();
        coords.dedup();
        coords
    }
}

/// Whether two segments in adjacent tiles connect across their shared
/// boundary.
///
/// `near` must contain the edge facing the neighbor and `far` must
/// symmetrically contain the opposite-facing edge. Segments that merely sit
/// next to each other without meeting at the boundary do not connect.
fn connects(near: &SegmentRef, far: &SegmentRef) -> bool {
    let dx = far.coord.x - near.coord.x;
    let dy = far.coord.y - near.coord.y;
    let facing = match (dx, dy) {
        (1, 0) => crate::board::Edge::Right,
        (-1, 0) => crate::board::Edge::Left,
        (0, 1) => crate::board::Edge::Bottom,
        (0, -1) => crate::board::Edge::Top,
        _ => return false,
    };
    near.segment.touches(facing) && far.segment.touches(facing.opposite())
}

/// Detect all road networks in a resolved tile map.
///
/// Collects every segment on the visible tiles (the map is already
/// top-of-stack, so covered segments never appear), then flood fills the
/// segment graph under the edge-connectivity rule. Networks and their
/// member segments come out in deterministic order.
#[must_use]
pub fn find_road_networks(tiles: &TileMap) -> Vec<RoadNetwork> {
    let mut segments: Vec<SegmentRef> = Vec::new();
    for tile in tiles {
        for &segment in &tile.roads {
            segments.push(SegmentRef {
                coord: tile.coord,
                segment,
                card: tile.card,
            });
        }
    }

    // Coordinate index so each node only tests segments in its four
    // neighboring tiles.
    let mut by_coord: HashMap<Coord, Vec<usize>> = HashMap::new();
    for (idx, seg) in segments.iter().enumerate() {
        by_coord.entry(seg.coord).or_default().push(idx);
    }

    let mut visited = vec![false; segments.len()];
    let mut networks = Vec::new();

    for start in 0..segments.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        let mut members = vec![start];
        let mut stack = vec![start];

        while let Some(idx) = stack.pop() {
            let here = segments[idx];
            for neighbor_coord in here.coord.neighbors() {
                let Some(candidates) = by_coord.get(&neighbor_coord) else {
                    continue;
                };
                for &other in candidates {
                    if !visited[other] && connects(&here, &segments[other]) {
                        visited[other] = true;
                        members.push(other);
                        stack.push(other);
                    }
                }
            }
        }

        let mut network: Vec<SegmentRef> = members.into_iter().map(|i| segments[i]).collect();
        network.sort_unstable();
        networks.push(RoadNetwork { segments: network });
    }

    networks.sort_unstable_by_key(|n| n.segments.first().copied());
    networks
}
