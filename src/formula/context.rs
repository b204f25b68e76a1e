//! Read-only board snapshot exposed to running formulas.
//!
//! The snapshot is a deep copy of a [`BoardAnalysis`], detached from the
//! engine's own data so that worker threads can hold it without borrowing
//! across threads. Formulas address tiles, clusters, and networks through
//! small index handles; the snapshot resolves a handle to its data on
//! every field or method access.

use crate::analysis::BoardAnalysis;
use crate::board::{Coord, RoadSegment, ZoneType};
use std::collections::HashMap;

/// A tile as the formula runtime sees it.
#[derive(Debug, Clone)]
pub(crate) struct SnapTile {
    pub(crate) coord: Coord,
    pub(crate) zone: ZoneType,
    pub(crate) roads: Vec<RoadSegment>,
}

/// A cluster as the formula runtime sees it, holding tile handles.
#[derive(Debug, Clone)]
pub(crate) struct SnapCluster {
    pub(crate) zone: ZoneType,
    pub(crate) tiles: Vec<u32>,
}

/// A road network as the formula runtime sees it.
#[derive(Debug, Clone)]
pub(crate) struct SnapNetwork {
    pub(crate) segments: usize,
    pub(crate) tiles: Vec<u32>,
}

/// Immutable board state shared with formula workers.
///
/// Tiles are stored in coordinate order, so handle values and every list
/// the context methods return are deterministic for a given board.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    tiles: Vec<SnapTile>,
    clusters: Vec<SnapCluster>,
    networks: Vec<SnapNetwork>,
    by_coord: HashMap<Coord, u32>,
}

impl Snapshot {
    /// Deep-copy an analysis into a thread-independent snapshot.
    pub(crate) fn from_analysis(analysis: &BoardAnalysis) -> Self {
        let mut tiles = Vec::with_capacity(analysis.tiles.len());
        let mut by_coord = HashMap::with_capacity(analysis.tiles.len());
        for tile in analysis.tiles.iter() {
            #[allow(clippy::cast_possible_truncation)]
            let handle = tiles.len() as u32;
            by_coord.insert(tile.coord, handle);
            tiles.push(SnapTile {
                coord: tile.coord,
                zone: tile.zone.clone(),
                roads: tile.roads.clone(),
            });
        }

        let clusters = analysis
            .clusters
            .iter()
            .map(|cluster| SnapCluster {
                zone: cluster.zone.clone(),
                tiles: cluster
                    .tiles
                    .iter()
                    .filter_map(|t| by_coord.get(&t.coord).copied())
                    .collect(),
            })
            .collect();

        let networks = analysis
            .networks
            .iter()
            .map(|network| SnapNetwork {
                segments: network.size(),
                tiles: network
                    .coords()
                    .iter()
                    .filter_map(|c| by_coord.get(c).copied())
                    .collect(),
            })
            .collect();

        Self {
            tiles,
            clusters,
            networks,
            by_coord,
        }
    }

    pub(crate) fn tile(&self, handle: u32) -> Option<&SnapTile> {
        self.tiles.get(handle as usize)
    }

    pub(crate) fn cluster(&self, handle: u32) -> Option<&SnapCluster> {
        self.clusters.get(handle as usize)
    }

    pub(crate) fn network(&self, handle: u32) -> Option<&SnapNetwork> {
        self.networks.get(handle as usize)
    }

    pub(crate) fn tile_at(&self, coord: Coord) -> Option<u32> {
        self.by_coord.get(&coord).copied()
    }

    /// Handles of every tile, in coordinate order.
    pub(crate) fn tile_handles(&self) -> std::ops::Range<u32> {
        #[allow(clippy::cast_possible_truncation)]
        let end = self.tiles.len() as u32;
        0..end
    }

    pub(crate) fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub(crate) fn network_count(&self) -> usize {
        self.networks.len()
    }

    /// Occupied neighbor handles of a tile, in edge order.
    pub(crate) fn neighbors(&self, handle: u32) -> Vec<u32> {
        let Some(tile) = self.tile(handle) else {
            return Vec::new();
        };
        tile.coord
            .neighbors()
            .iter()
            .filter_map(|c| self.tile_at(*c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::board::{Card, CardId};

    fn sample() -> BoardAnalysis {
        let cards = vec![
            Card::uniform(CardId(1), 0, 0, &ZoneType::residential()),
            Card::uniform(CardId(2), 2, 0, &ZoneType::park()),
        ];
        analyze(&cards)
    }

    #[test]
    fn test_snapshot_preserves_tile_count() {
        let analysis = sample();
        let snapshot = Snapshot::from_analysis(&analysis);
        assert_eq!(snapshot.tile_handles().len(), analysis.tiles.len());
        assert_eq!(snapshot.cluster_count(), analysis.clusters.len());
        assert_eq!(snapshot.network_count(), analysis.networks.len());
    }

    #[test]
    fn test_tile_lookup_by_coord() {
        let snapshot = Snapshot::from_analysis(&sample());
        let handle = snapshot.tile_at(Coord::new(0, 0)).unwrap();
        let tile = snapshot.tile(handle).unwrap();
        assert_eq!(tile.coord, Coord::new(0, 0));
        assert_eq!(tile.zone, ZoneType::residential());
        assert!(snapshot.tile_at(Coord::new(99, 99)).is_none());
    }

    #[test]
    fn test_neighbors_skip_empty_cells() {
        let snapshot = Snapshot::from_analysis(&sample());
        // (1, 0) borders (0, 0), (2, 0), and (1, 1); all occupied.
        let handle = snapshot.tile_at(Coord::new(1, 0)).unwrap();
        assert_eq!(snapshot.neighbors(handle).len(), 3);
        // A corner tile has two occupied neighbors.
        let corner = snapshot.tile_at(Coord::new(0, 1)).unwrap();
        assert_eq!(snapshot.neighbors(corner).len(), 2);
    }

    #[test]
    fn test_cluster_handles_resolve() {
        let snapshot = Snapshot::from_analysis(&sample());
        for index in 0..snapshot.cluster_count() {
            #[allow(clippy::cast_possible_truncation)]
            let cluster = snapshot.cluster(index as u32).unwrap();
            assert!(!cluster.tiles.is_empty());
            for &tile in &cluster.tiles {
                assert!(snapshot.tile(tile).is_some());
            }
        }
    }
}
