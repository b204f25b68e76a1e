//! Board topology analysis: clusters and road networks.
//!
//! Both detectors consume the one authoritative resolved tile map, so
//! cluster membership and road ownership can never disagree about which
//! card is on top at a coordinate.

mod cluster;
mod roads;

pub use cluster::{Cluster, find_clusters};
pub use roads::{RoadNetwork, SegmentRef, find_road_networks};

use crate::board::{Card, TileMap, board_fingerprint, resolve_board};

/// The complete topological analysis of one board state.
///
/// Owned by the call that produced it; nothing here references caller
/// state. Formula snapshots are built from this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardAnalysis {
    /// The resolved visible tile map.
    pub tiles: TileMap,
    /// Same-zone connected regions, in deterministic order.
    pub clusters: Vec<Cluster>,
    /// Road networks, in deterministic order.
    pub networks: Vec<RoadNetwork>,
    /// Content fingerprint of the card list that produced this analysis.
    pub fingerprint: u128,
}

/// Resolve a board and detect its clusters and road networks.
///
/// The two detectors are independent of each other and run in parallel.
#[must_use]
pub fn analyze(cards: &[Card]) -> BoardAnalysis {
    let tiles = resolve_board(cards);
    let (clusters, networks) =
        rayon::join(|| find_clusters(&tiles), || find_road_networks(&tiles));
    BoardAnalysis {
        tiles,
        clusters,
        networks,
        fingerprint: board_fingerprint(cards),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{CardId, Edge, RoadSegment, ZoneType};

    #[test]
    fn test_analyze_empty_board() {
        let analysis = analyze(&[]);
        assert!(analysis.tiles.is_empty());
        assert!(analysis.clusters.is_empty());
        assert!(analysis.networks.is_empty());
    }

    #[test]
    fn test_analyze_matches_standalone_detectors() {
        let mut card = Card::uniform(CardId(1), 0, 0, &ZoneType::residential());
        card.cells[1][0].roads = vec![RoadSegment(Edge::Left, Edge::Right)];
        let cards = vec![card, Card::uniform(CardId(2), 4, 0, &ZoneType::park())];

        let analysis = analyze(&cards);
        let tiles = resolve_board(&cards);
        assert_eq!(analysis.clusters, find_clusters(&tiles));
        assert_eq!(analysis.networks, find_road_networks(&tiles));
        assert_eq!(analysis.fingerprint, board_fingerprint(&cards));
    }
}
