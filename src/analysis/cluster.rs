//! Connected same-zone region detection.

use crate::board::{Coord, Tile, TileMap, ZoneType};
use std::collections::{HashSet, VecDeque};

/// A maximal connected region of same-zone tiles.
///
/// Two tiles belong to the same cluster iff they are connected via a
/// 4-directional path of visible tiles of the same zone type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Zone type shared by every tile in the region.
    pub zone: ZoneType,
    /// Member tiles, sorted by coordinate.
    pub tiles: Vec<Tile>,
}

impl Cluster {
    /// Number of tiles in the region.
    #[must_use]
    pub fn size(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the region contains the given coordinate.
    #[must_use]
    pub fn contains(&self, coord: Coord) -> bool {
        self.tiles.iter().any(|t| t.coord == coord)
    }
}

/// Detect all clusters in a resolved tile map.
///
/// Standard flood fill: each unvisited tile seeds a region grown through
/// 4-directional adjacency restricted to equal zone types. Membership is
/// independent of which tile seeds a region; tiles within a cluster and
/// clusters themselves come out in coordinate order, so the result is
/// fully deterministic. An empty map yields an empty list.
#[must_use]
pub fn find_clusters(tiles: &TileMap) -> Vec<Cluster> {
    let mut visited: HashSet<Coord> = HashSet::with_capacity(tiles.len());
    let mut clusters = Vec::new();

    for seed in tiles {
        if visited.contains(&seed.coord) {
            continue;
        }

        let mut members = Vec::new();
        let mut queue = VecDeque::new();
        visited.insert(seed.coord);
        queue.push_back(seed);

        while let Some(tile) = queue.pop_front() {
            members.push(tile.clone());
            for neighbor in tile.coord.neighbors() {
                if visited.contains(&neighbor) {
                    continue;
                }
                if let Some(next) = tiles.get(neighbor)
                    && next.zone == seed.zone
                {
                    visited.insert(neighbor);
                    queue.push_back(next);
                }
            }
        }

        members.sort_by_key(|t| t.coord);
        clusters.push(Cluster {
            zone: seed.zone.clone(),
            tiles: members,
        });
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Card, CardId, resolve_board};

    fn zones(clusters: &[Cluster]) -> Vec<(&str, usize)> {
        clusters
            .iter()
            .map(|c| (c.zone.as_str(), c.size()))
            .collect()
    }

    #[test]
    fn test_empty_board_has_no_clusters() {
        assert!(find_clusters(&TileMap::new()).is_empty());
    }

    #[test]
    fn test_single_card_is_one_cluster() {
        let map = resolve_board(&[Card::uniform(CardId(1), 0, 0, &ZoneType::park())]);
        let clusters = find_clusters(&map);
        assert_eq!(zones(&clusters), vec![("park", 4)]);
    }

    #[test]
    fn test_touching_same_zone_cards_merge() {
        let map = resolve_board(&[
            Card::uniform(CardId(1), 0, 0, &ZoneType::park()),
            Card::uniform(CardId(2), 2, 0, &ZoneType::park()),
        ]);
        let clusters = find_clusters(&map);
        assert_eq!(zones(&clusters), vec![("park", 8)]);
    }

    #[test]
    fn test_diagonal_does_not_connect() {
        let map = resolve_board(&[
            Card::uniform(CardId(1), 0, 0, &ZoneType::park()),
            Card::uniform(CardId(2), 2, 2, &ZoneType::park()),
        ]);
        let clusters = find_clusters(&map);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| c.size() == 4));
    }

    #[test]
    fn test_different_zones_stay_separate() {
        let map = resolve_board(&[
            Card::uniform(CardId(1), 0, 0, &ZoneType::park()),
            Card::uniform(CardId(2), 2, 0, &ZoneType::industrial()),
        ]);
        let clusters = find_clusters(&map);
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_overlap_splits_covered_cluster() {
        // All-residential at (0,0), all-industrial overlapping at (1,0).
        // Only (0,0) and (0,1) stay residential.
        let map = resolve_board(&[
            Card::uniform(CardId(1), 0, 0, &ZoneType::residential()),
            Card::uniform(CardId(2), 1, 0, &ZoneType::industrial()),
        ]);
        let clusters = find_clusters(&map);
        let residential = clusters
            .iter()
            .find(|c| c.zone == ZoneType::residential())
            .unwrap();
        let industrial = clusters
            .iter()
            .find(|c| c.zone == ZoneType::industrial())
            .unwrap();
        // The remaining residential column is still connected vertically.
        assert_eq!(residential.size(), 2);
        assert_eq!(industrial.size(), 4);
    }

    #[test]
    fn test_membership_is_a_partition() {
        let map = resolve_board(&[
            Card::uniform(CardId(1), 0, 0, &ZoneType::residential()),
            Card::uniform(CardId(2), 1, 0, &ZoneType::industrial()),
            Card::uniform(CardId(3), 5, 5, &ZoneType::park()),
        ]);
        let clusters = find_clusters(&map);
        let total: usize = clusters.iter().map(Cluster::size).sum();
        assert_eq!(total, map.len());
        for tile in &map {
            let holders = clusters.iter().filter(|c| c.contains(tile.coord)).count();
            assert_eq!(holders, 1, "tile {} in {holders} clusters", tile.coord);
        }
    }
}
