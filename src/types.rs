//! Core value types shared across all modules.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::registry::BlockRegistry;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// A fractional world-space position (player coordinates).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Move `distance` units along `direction`.
    pub fn towards(self, direction: Direction, distance: f64) -> Self {
        let (dx, dy, dz) = direction.unit();
        Self::new(
            self.x + dx as f64 * distance,
            self.y + dy as f64 * distance,
            self.z + dz as f64 * distance,
        )
    }

    pub fn distance(self, other: Position) -> f64 {
        let (dx, dy, dz) = (other.x - self.x, other.y - self.y, other.z - self.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// The block containing this position.
    pub fn tile(self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// An integer block coordinate.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Coordinates saturate at the `i32` bounds.
    pub fn towards(self, direction: Direction, distance: i32) -> Self {
        let (dx, dy, dz) = direction.unit();
        self.offset(
            dx.saturating_mul(distance),
            dy.saturating_mul(distance),
            dz.saturating_mul(distance),
        )
    }

    /// Coordinates saturate at the `i32` bounds.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(
            self.x.saturating_add(dx),
            self.y.saturating_add(dy),
            self.z.saturating_add(dz),
        )
    }

    /// Centre of the block in fractional coordinates.
    pub fn centre(self) -> Position {
        Position::new(
            self.x as f64 + 0.5,
            self.y as f64,
            self.z as f64 + 0.5,
        )
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{},{}]", self.x, self.y, self.z)
    }
}

impl From<BlockPos> for Position {
    fn from(pos: BlockPos) -> Self {
        Position::new(pos.x as f64, pos.y as f64, pos.z as f64)
    }
}

/// Compass direction in engine space (north is -z, east is +x).
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

impl Direction {
    pub fn unit(self) -> (i32, i32, i32) {
        match self {
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
            Direction::Up => (0, 1, 0),
            Direction::Down => (0, -1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port` of the remote engine.
    pub address: String,
    /// Name announced during the handshake.
    pub client_name: String,
    /// Upper bound on TCP connect + handshake.
    #[serde(with = "duration_ms")]
    pub connect_timeout: Duration,
    /// When set, poll the engine for events at this interval.
    #[serde(with = "opt_duration_ms")]
    pub poll_interval: Option<Duration>,
    /// Codec registry override; `None` uses [`BlockRegistry::standard`].
    #[serde(skip)]
    pub registry: Option<BlockRegistry>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: "localhost:4711".into(),
            client_name: "blockwire".into(),
            connect_timeout: Duration::from_secs(5),
            poll_interval: None,
            registry: None,
        }
    }
}

impl ClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod opt_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn towards_moves_along_axis() {
        let p = Position::new(1.0, 64.0, 1.0);
        assert_eq!(p.towards(Direction::North, 3.0), Position::new(1.0, 64.0, -2.0));
        assert_eq!(p.towards(Direction::East, 2.0), Position::new(3.0, 64.0, 1.0));
    }

    #[test]
    fn block_steps_saturate_at_world_edge() {
        let edge = BlockPos::new(i32::MAX - 1, 0, i32::MIN + 1);
        assert_eq!(
            edge.towards(Direction::East, 5),
            BlockPos::new(i32::MAX, 0, i32::MIN + 1)
        );
        assert_eq!(
            edge.towards(Direction::North, i32::MAX),
            BlockPos::new(i32::MAX - 1, 0, i32::MIN)
        );
        assert_eq!(edge.offset(10, 0, -10), BlockPos::new(i32::MAX, 0, i32::MIN));
        assert_eq!(
            BlockPos::new(1, 2, 3).towards(Direction::Down, 2),
            BlockPos::new(1, 0, 3)
        );
    }

    #[test]
    fn tile_floors_negative_coordinates() {
        let p = Position::new(-0.5, 10.9, 3.2);
        assert_eq!(p.tile(), BlockPos::new(-1, 10, 3));
    }

    #[test]
    fn config_deserializes_millis() {
        let cfg: ClientConfig =
            serde_json::from_str(r#"{"address":"mc:4711","poll_interval":250}"#).unwrap();
        assert_eq!(cfg.address, "mc:4711");
        assert_eq!(cfg.poll_interval, Some(Duration::from_millis(250)));
        assert_eq!(cfg.connect_timeout, Duration::from_secs(5));
    }
}
