//! Board data model and the board resolver.
//!
//! A board is an ordered list of placed 2x2 cards. Resolution flattens it
//! into a map of visible tiles under the last-placed-wins rule; everything
//! downstream (clusters, road networks, scoring, formula snapshots) works
//! off that one resolved map.

mod card;
mod fingerprint;
mod tile;

pub use card::{Card, CardId, Cell, Edge, RoadSegment, Rotation, ZoneType};
pub use fingerprint::{board_fingerprint, source_key};
pub use tile::{Coord, Tile, TileMap, resolve_board};
