//! World coordinates, resolved tiles, and the tile map.

use crate::board::card::{Card, CardId, RoadSegment, ZoneType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A coordinate on the unbounded world grid, in tile units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Coord {
    /// X coordinate (column, grows east).
    pub x: i32,
    /// Y coordinate (row, grows south).
    pub y: i32,
}

impl Coord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The four 4-directional neighbors (north, east, south, west).
    ///
    /// The grid is unbounded, so all four always exist.
    #[must_use]
    pub const fn neighbors(self) -> [Self; 4] {
        [
            Self::new(self.x, self.y - 1),
            Self::new(self.x + 1, self.y),
            Self::new(self.x, self.y + 1),
            Self::new(self.x - 1, self.y),
        ]
    }

    /// Manhattan distance to another coordinate.
    #[must_use]
    pub const fn distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Whether another coordinate is exactly one tile away along one axis.
    #[must_use]
    pub const fn is_adjacent(self, other: Self) -> bool {
        self.distance(other) == 1
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The resolved, world-coordinate view of one cell.
///
/// At most one tile exists per world coordinate; when multiple cards cover
/// the same coordinate the tile reflects the card placed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// World coordinate of this tile.
    pub coord: Coord,
    /// Zone tag of the visible cell.
    pub zone: ZoneType,
    /// Road segments of the visible cell.
    pub roads: Vec<RoadSegment>,
    /// Identity of the card this tile belongs to.
    pub card: CardId,
}

/// The resolved tile map of a board.
///
/// Backed by an ordered map so iteration is deterministic: tiles come out
/// sorted by (x, y) regardless of placement order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileMap {
    tiles: BTreeMap<Coord, Tile>,
}

impl TileMap {
    /// Create an empty tile map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of visible tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the map has no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Look up the tile at a coordinate.
    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    /// Insert a tile, unconditionally overwriting any prior entry at the
    /// same coordinate. This is the last-placed-wins rule.
    pub fn insert(&mut self, tile: Tile) {
        self.tiles.insert(tile.coord, tile);
    }

    /// Iterate tiles in coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Iterate coordinates in order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.tiles.keys().copied()
    }
}

impl<'a> IntoIterator for &'a TileMap {
    type Item = &'a Tile;
    type IntoIter = std::collections::btree_map::Values<'a, Coord, Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.values()
    }
}

/// Flatten an ordered list of placed cards into the visible tile map.
///
/// Cards are iterated in placement order and each of their four cells is
/// written into the map, overwriting any earlier entry at that coordinate.
/// This single resolved map is the authoritative ownership resolution used
/// by both the cluster detector and the road network detector.
///
/// An empty board yields an empty map.
#[must_use]
pub fn resolve_board(cards: &[Card]) -> TileMap {
    let mut map = TileMap::new();
    for card in cards {
        for (x, y, cell) in card.world_cells() {
            map.insert(Tile {
                coord: Coord::new(x, y),
                zone: cell.zone,
                roads: cell.roads,
                card: card.id,
            });
        }
    }
    map
}
