//! Cards, cells, zone types, and road segments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a placed card.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

/// Rotation applied to a card before placement.
///
/// Only 0 and 180 degrees exist; a 2x2 card rotated 180 degrees maps cell
/// (row, col) to (1 - row, 1 - col) and flips every road edge to its
/// opposite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    /// No rotation.
    #[default]
    R0,
    /// Half turn.
    R180,
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(deg: u16) -> Result<Self, Self::Error> {
        match deg {
            0 => Ok(Self::R0),
            180 => Ok(Self::R180),
            other => Err(format!("invalid rotation {other}, expected 0 or 180")),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(r: Rotation) -> Self {
        match r {
            Rotation::R0 => 0,
            Rotation::R180 => 180,
        }
    }
}

/// One edge of a cell. The numeric ids match the board format:
/// 0=top, 1=right, 2=bottom, 3=left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Edge {
    /// Toward negative y.
    Top = 0,
    /// Toward positive x.
    Right = 1,
    /// Toward positive y.
    Bottom = 2,
    /// Toward negative x.
    Left = 3,
}

impl Edge {
    /// The edge facing this one from the neighboring tile.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }

    /// World-coordinate offset of the tile this edge faces.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Top => (0, -1),
            Self::Right => (1, 0),
            Self::Bottom => (0, 1),
            Self::Left => (-1, 0),
        }
    }

    /// All four edges in id order.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::Top, Self::Right, Self::Bottom, Self::Left]
    }
}

impl TryFrom<u8> for Edge {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Self::Top),
            1 => Ok(Self::Right),
            2 => Ok(Self::Bottom),
            3 => Ok(Self::Left),
            other => Err(format!("invalid edge id {other}, expected 0-3")),
        }
    }
}

impl From<Edge> for u8 {
    fn from(e: Edge) -> Self {
        e as Self
    }
}

/// A road marking within one cell: the road enters at one edge and exits
/// at another. The two edges are never equal; opposite edges form a
/// straight road, adjacent edges a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoadSegment(pub Edge, pub Edge);

impl RoadSegment {
    /// Whether either end of this segment lies on the given edge.
    #[must_use]
    pub fn touches(self, edge: Edge) -> bool {
        self.0 == edge || self.1 == edge
    }

    /// The segment as seen after rotating its card 180 degrees.
    #[must_use]
    pub const fn rotated(self) -> Self {
        Self(self.0.opposite(), self.1.opposite())
    }
}

/// The zone tag of a cell.
///
/// This is an open tag rather than a closed enum: decks may introduce new
/// zone names and the engine treats them uniformly. Well-known names are
/// provided as constructors for convenience.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneType(Box<str>);

impl ZoneType {
    /// Create a zone tag from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().into_boxed_str())
    }

    /// The zone name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `residential` zone.
    #[must_use]
    pub fn residential() -> Self {
        Self::new("residential")
    }

    /// The `commercial` zone.
    #[must_use]
    pub fn commercial() -> Self {
        Self::new("commercial")
    }

    /// The `industrial` zone.
    #[must_use]
    pub fn industrial() -> Self {
        Self::new("industrial")
    }

    /// The `park` zone.
    #[must_use]
    pub fn park() -> Self {
        Self::new("park")
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One cell of a card: a zone tag plus zero or more road segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Zone tag of this cell.
    pub zone: ZoneType,
    /// Road segments crossing this cell. Multiple segments represent a
    /// multi-way junction.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roads: Vec<RoadSegment>,
}

impl Cell {
    /// Create a cell with no roads.
    #[must_use]
    pub fn new(zone: ZoneType) -> Self {
        Self {
            zone,
            roads: Vec::new(),
        }
    }

    /// Create a cell with road segments.
    #[must_use]
    pub fn with_roads(zone: ZoneType, roads: Vec<RoadSegment>) -> Self {
        Self { zone, roads }
    }
}

/// A placed 2x2 group of cells.
///
/// Cards are immutable once placed; rotation is applied before placement
/// and baked in when cells are projected to world coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Card identity.
    pub id: CardId,
    /// Anchor x position in world tile units (top-left cell before rotation).
    pub x: i32,
    /// Anchor y position in world tile units.
    pub y: i32,
    /// Rotation applied before placement.
    #[serde(default)]
    pub rotation: Rotation,
    /// The 2x2 cell grid, indexed `cells[row][col]`.
    pub cells: [[Cell; 2]; 2],
}

impl Card {
    /// Create a card at the given anchor with no rotation.
    #[must_use]
    pub fn new(id: CardId, x: i32, y: i32, cells: [[Cell; 2]; 2]) -> Self {
        Self {
            id,
            x,
            y,
            rotation: Rotation::R0,
            cells,
        }
    }

    /// Create a card filled with one zone and no roads.
    #[must_use]
    pub fn uniform(id: CardId, x: i32, y: i32, zone: &ZoneType) -> Self {
        let cell = Cell::new(zone.clone());
        Self::new(
            id,
            x,
            y,
            [
                [cell.clone(), cell.clone()],
                [cell.clone(), cell],
            ],
        )
    }

    /// Set the rotation, builder style.
    #[must_use]
    pub fn rotated(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Iterate the card's cells as they land on the world grid: for each
    /// cell, the world coordinate plus the cell with rotation applied to
    /// its road segments.
    pub fn world_cells(&self) -> impl Iterator<Item = (i32, i32, Cell)> + '_ {
        (0..2usize).flat_map(move |row| {
            (0..2usize).map(move |col| {
                let (r, c) = match self.rotation {
                    Rotation::R0 => (row, col),
                    Rotation::R180 => (1 - row, 1 - col),
                };
                let source = &self.cells[r][c];
                let roads = match self.rotation {
                    Rotation::R0 => source.roads.clone(),
                    Rotation::R180 => source.roads.iter().map(|s| s.rotated()).collect(),
                };
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let (wx, wy) = (self.x + col as i32, self.y + row as i32);
                (wx, wy, Cell::with_roads(source.zone.clone(), roads))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_opposite() {
        assert_eq!(Edge::Top.opposite(), Edge::Bottom);
        assert_eq!(Edge::Right.opposite(), Edge::Left);
        for edge in Edge::all() {
            assert_eq!(edge.opposite().opposite(), edge);
        }
    }

    #[test]
    fn test_edge_id_round_trip() {
        for edge in Edge::all() {
            let id = u8::from(edge);
            assert_eq!(Edge::try_from(id).unwrap(), edge);
        }
        assert!(Edge::try_from(4).is_err());
    }

    #[test]
    fn test_rotation_try_from() {
        assert_eq!(Rotation::try_from(0).unwrap(), Rotation::R0);
        assert_eq!(Rotation::try_from(180).unwrap(), Rotation::R180);
        assert!(Rotation::try_from(90).is_err());
    }

    #[test]
    fn test_segment_touches() {
        let seg = RoadSegment(Edge::Top, Edge::Right);
        assert!(seg.touches(Edge::Top));
        assert!(seg.touches(Edge::Right));
        assert!(!seg.touches(Edge::Left));
    }

    #[test]
    fn test_world_cells_no_rotation() {
        let card = Card::uniform(CardId(1), 3, 4, &ZoneType::park());
        let coords: Vec<(i32, i32)> = card.world_cells().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(coords, vec![(3, 4), (4, 4), (3, 5), (4, 5)]);
    }

    #[test]
    fn test_world_cells_rotated_flips_grid_and_edges() {
        let mut card = Card::uniform(CardId(1), 0, 0, &ZoneType::residential());
        card.cells[0][0].zone = ZoneType::park();
        card.cells[0][0].roads = vec![RoadSegment(Edge::Top, Edge::Right)];
        let card = card.rotated(Rotation::R180);

        // The park cell lands at the opposite corner (1, 1)...
        let cells: Vec<(i32, i32, Cell)> = card.world_cells().collect();
        let park = cells
            .iter()
            .find(|(_, _, c)| c.zone == ZoneType::park())
            .unwrap();
        assert_eq!((park.0, park.1), (1, 1));
        // ...with its road edges flipped to their opposites.
        assert_eq!(park.2.roads, vec![RoadSegment(Edge::Bottom, Edge::Left)]);
    }

    #[test]
    fn test_card_json_round_trip() {
        let card = Card::uniform(CardId(7), -1, 2, &ZoneType::industrial())
            .rotated(Rotation::R180);
        let json = serde_json::to_string(&card).unwrap();
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);
    }
}
