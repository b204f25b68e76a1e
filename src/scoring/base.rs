//! Deterministic base score from clusters and road networks.

// Score arithmetic narrows collection sizes into i64 point values
#![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]

use crate::analysis::BoardAnalysis;
use crate::board::ZoneType;
use serde::Serialize;
use std::collections::BTreeMap;

/// The base score breakdown for one board state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BaseScore {
    /// Per zone type, the size of its largest cluster.
    pub cluster_scores: BTreeMap<ZoneType, u64>,
    /// Minus one point per distinct road network. Always <= 0.
    pub road_penalty: i64,
    /// Sum of all cluster scores plus the road penalty.
    pub base_score: i64,
}

/// Compute the base score of an analyzed board.
///
/// For every zone type present on the board, the size of its largest
/// cluster contributes positively; every distinct road network costs one
/// point regardless of its segment count. Pure: same analysis, same score.
#[must_use]
pub fn calculate_base_score(analysis: &BoardAnalysis) -> BaseScore {
    let mut cluster_scores: BTreeMap<ZoneType, u64> = BTreeMap::new();
    for cluster in &analysis.clusters {
        let size = cluster.size() as u64;
        cluster_scores
            .entry(cluster.zone.clone())
            .and_modify(|best| *best = (*best).max(size))
            .or_insert(size);
    }

    let road_penalty = -(analysis.networks.len() as i64);
    let cluster_total: i64 = cluster_scores.values().map(|&s| s as i64).sum();

    BaseScore {
        cluster_scores,
        road_penalty,
        base_score: cluster_total + road_penalty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::board::{Card, CardId, Edge, RoadSegment};

    #[test]
    fn test_empty_board_scores_zero() {
        let score = calculate_base_score(&analyze(&[]));
        assert!(score.cluster_scores.is_empty());
        assert_eq!(score.road_penalty, 0);
        assert_eq!(score.base_score, 0);
    }

    #[test]
    fn test_only_largest_cluster_per_zone_counts() {
        // Two disconnected park regions of size 4 and 8: only the 8 counts.
        let cards = vec![
            Card::uniform(CardId(1), 0, 0, &ZoneType::park()),
            Card::uniform(CardId(2), 10, 0, &ZoneType::park()),
            Card::uniform(CardId(3), 12, 0, &ZoneType::park()),
        ];
        let score = calculate_base_score(&analyze(&cards));
        assert_eq!(score.cluster_scores[&ZoneType::park()], 8);
        assert_eq!(score.base_score, 8);
    }

    #[test]
    fn test_each_zone_contributes_once() {
        let cards = vec![
            Card::uniform(CardId(1), 0, 0, &ZoneType::park()),
            Card::uniform(CardId(2), 10, 0, &ZoneType::industrial()),
        ];
        let score = calculate_base_score(&analyze(&cards));
        assert_eq!(score.cluster_scores.len(), 2);
        assert_eq!(score.base_score, 8);
    }

    #[test]
    fn test_road_penalty_counts_networks_not_segments() {
        // One connected two-segment road and one isolated segment: -2.
        let mut a = Card::uniform(CardId(1), 0, 0, &ZoneType::residential());
        a.cells[0][0].roads = vec![RoadSegment(Edge::Right, Edge::Left)];
        a.cells[0][1].roads = vec![RoadSegment(Edge::Left, Edge::Right)];
        a.cells[1][1].roads = vec![RoadSegment(Edge::Top, Edge::Bottom)];
        let score = calculate_base_score(&analyze(&[a]));
        assert_eq!(score.road_penalty, -2);
        assert_eq!(score.base_score, 4 - 2);
    }
}
