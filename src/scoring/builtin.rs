//! Built-in scoring conditions.
//!
//! These are the native conditions bundled with the engine. All of them
//! clamp to non-negative points (their own policy, not a trait invariant)
//! and return the tiles that earned the award as highlights.

// Points are derived from collection sizes
#![allow(clippy::cast_possible_wrap)]

use crate::analysis::{BoardAnalysis, Cluster};
use crate::board::{Coord, ZoneType};
use crate::scoring::condition::{ConditionDetails, ScoringCondition};
use std::sync::Arc;

/// Largest connected residential district, one point per tile.
#[derive(Debug, Clone, Copy)]
pub struct ResidentialDistrict;

/// One point per park tile anywhere on the board.
#[derive(Debug, Clone, Copy)]
pub struct ParkCoverage;

/// Two points per industrial cluster with no residential tile next to it.
#[derive(Debug, Clone, Copy)]
pub struct IndustrialIsolation;

/// Rewards consolidating all roads: the segment count of the single road
/// network, or nothing when roads are fragmented.
#[derive(Debug, Clone, Copy)]
pub struct UnifiedRoads;

/// The built-in condition set, in registry order.
#[must_use]
pub fn builtin_conditions() -> Vec<Arc<dyn ScoringCondition>> {
    vec![
        Arc::new(ResidentialDistrict),
        Arc::new(ParkCoverage),
        Arc::new(IndustrialIsolation),
        Arc::new(UnifiedRoads),
    ]
}

fn largest_cluster<'a>(analysis: &'a BoardAnalysis, zone: &ZoneType) -> Option<&'a Cluster> {
    analysis
        .clusters
        .iter()
        .filter(|c| &c.zone == zone)
        .max_by_key(|c| c.size())
}

impl ScoringCondition for ResidentialDistrict {
    fn id(&self) -> &str {
        "residential-district"
    }

    fn name(&self) -> &str {
        "Residential District"
    }

    fn description(&self) -> &str {
        "One point per tile in the largest residential cluster"
    }

    fn target_points(&self) -> i64 {
        8
    }

    fn evaluate(&self, analysis: &BoardAnalysis) -> i64 {
        largest_cluster(analysis, &ZoneType::residential())
            .map_or(0, |c| c.size() as i64)
    }

    fn evaluate_with_details(&self, analysis: &BoardAnalysis) -> ConditionDetails {
        match largest_cluster(analysis, &ZoneType::residential()) {
            Some(cluster) => ConditionDetails {
                points: cluster.size() as i64,
                tiles: cluster.tiles.iter().map(|t| t.coord).collect(),
                description: format!(
                    "Largest residential district spans {} tiles",
                    cluster.size()
                ),
                error: None,
            },
            None => ConditionDetails::empty("No residential district on the board"),
        }
    }
}

impl ScoringCondition for ParkCoverage {
    fn id(&self) -> &str {
        "park-coverage"
    }

    fn name(&self) -> &str {
        "Park Coverage"
    }

    fn description(&self) -> &str {
        "One point per visible park tile"
    }

    fn target_points(&self) -> i64 {
        6
    }

    fn evaluate(&self, analysis: &BoardAnalysis) -> i64 {
        let park = ZoneType::park();
        analysis.tiles.iter().filter(|t| t.zone == park).count() as i64
    }

    fn evaluate_with_details(&self, analysis: &BoardAnalysis) -> ConditionDetails {
        let park = ZoneType::park();
        let tiles: Vec<Coord> = analysis
            .tiles
            .iter()
            .filter(|t| t.zone == park)
            .map(|t| t.coord)
            .collect();
        if tiles.is_empty() {
            return ConditionDetails::empty("No parks on the board");
        }
        ConditionDetails {
            points: tiles.len() as i64,
            description: format!("{} park tiles", tiles.len()),
            tiles,
            error: None,
        }
    }
}

impl IndustrialIsolation {
    /// Industrial clusters with no residential tile 4-adjacent to any member.
    fn isolated<'a>(analysis: &'a BoardAnalysis) -> Vec<&'a Cluster> {
        let industrial = ZoneType::industrial();
        let residential = ZoneType::residential();
        analysis
            .clusters
            .iter()
            .filter(|c| c.zone == industrial)
            .filter(|c| {
                !c.tiles.iter().any(|tile| {
                    tile.coord.neighbors().iter().any(|n| {
                        analysis
                            .tiles
                            .get(*n)
                            .is_some_and(|t| t.zone == residential)
                    })
                })
            })
            .collect()
    }
}

impl ScoringCondition for IndustrialIsolation {
    fn id(&self) -> &str {
        "industrial-isolation"
    }

    fn name(&self) -> &str {
        "Industrial Isolation"
    }

    fn description(&self) -> &str {
        "Two points per industrial cluster not touching any residential tile"
    }

    fn target_points(&self) -> i64 {
        6
    }

    fn evaluate(&self, analysis: &BoardAnalysis) -> i64 {
        Self::isolated(analysis).len() as i64 * 2
    }

    fn evaluate_with_details(&self, analysis: &BoardAnalysis) -> ConditionDetails {
        let isolated = Self::isolated(analysis);
        if isolated.is_empty() {
            return ConditionDetails::empty("No isolated industrial clusters");
        }
        ConditionDetails {
            points: isolated.len() as i64 * 2,
            tiles: isolated
                .iter()
                .flat_map(|c| c.tiles.iter().map(|t| t.coord))
                .collect(),
            description: format!("{} isolated industrial clusters", isolated.len()),
            error: None,
        }
    }
}

impl ScoringCondition for UnifiedRoads {
    fn id(&self) -> &str {
        "unified-roads"
    }

    fn name(&self) -> &str {
        "Unified Roads"
    }

    fn description(&self) -> &str {
        "One point per segment when all roads form a single network"
    }

    fn target_points(&self) -> i64 {
        5
    }

    fn evaluate(&self, analysis: &BoardAnalysis) -> i64 {
        match analysis.networks.as_slice() {
            [only] => only.size() as i64,
            _ => 0,
        }
    }

    fn evaluate_with_details(&self, analysis: &BoardAnalysis) -> ConditionDetails {
        match analysis.networks.as_slice() {
            [only] => ConditionDetails {
                points: only.size() as i64,
                tiles: only.coords(),
                description: format!("All {} road segments connect", only.size()),
                error: None,
            },
            [] => ConditionDetails::empty("No roads on the board"),
            many => ConditionDetails::empty(format!(
                "Roads are split into {} networks",
                many.len()
            )),
        }
    }
}
