//! Gameplay events pushed (or polled) from the remote engine.
//!
//! These are the *semantic* events handed to subscribers.  Wire parsing lives
//! in [`protocol`](crate::protocol); fan-out lives in `subscription`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{BlockPos, Direction, Position};

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    PlayerMoved,
    ChatPosted,
    BlockHit,
}

impl EventCategory {
    pub const ALL: [EventCategory; 3] = [
        EventCategory::PlayerMoved,
        EventCategory::ChatPosted,
        EventCategory::BlockHit,
    ];

    /// Dense index, used to address per-category queues.
    pub fn index(self) -> usize {
        match self {
            EventCategory::PlayerMoved => 0,
            EventCategory::ChatPosted => 1,
            EventCategory::BlockHit => 2,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventCategory::PlayerMoved => "player_moved",
            EventCategory::ChatPosted => "chat_posted",
            EventCategory::BlockHit => "block_hit",
        })
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// The tracked player changed position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerMoved {
    pub from: Position,
    pub to: Position,
}

/// Someone posted to chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPosted {
    pub entity_id: i64,
    pub message: String,
}

/// A block was hit (right-clicked with a sword in the classic engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHit {
    pub position: BlockPos,
    /// Face code: 0 down, 1 up, 2 north, 3 south, 4 west, 5 east.
    pub face: u8,
    pub entity_id: i64,
}

impl BlockHit {
    pub fn face_direction(&self) -> Option<Direction> {
        match self.face {
            0 => Some(Direction::Down),
            1 => Some(Direction::Up),
            2 => Some(Direction::North),
            3 => Some(Direction::South),
            4 => Some(Direction::West),
            5 => Some(Direction::East),
            _ => None,
        }
    }
}

/// Any inbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum WorldEvent {
    PlayerMoved(PlayerMoved),
    ChatPosted(ChatPosted),
    BlockHit(BlockHit),
}

impl WorldEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            WorldEvent::PlayerMoved(_) => EventCategory::PlayerMoved,
            WorldEvent::ChatPosted(_) => EventCategory::ChatPosted,
            WorldEvent::BlockHit(_) => EventCategory::BlockHit,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed access
// ---------------------------------------------------------------------------

/// A payload type that belongs to exactly one [`EventCategory`].
pub trait Event: fmt::Debug + Clone + Send + Sync + 'static {
    const CATEGORY: EventCategory;

    fn from_world_event(event: &WorldEvent) -> Option<&Self>;
}

impl Event for PlayerMoved {
    const CATEGORY: EventCategory = EventCategory::PlayerMoved;

    fn from_world_event(event: &WorldEvent) -> Option<&Self> {
        match event {
            WorldEvent::PlayerMoved(e) => Some(e),
            _ => None,
        }
    }
}

impl Event for ChatPosted {
    const CATEGORY: EventCategory = EventCategory::ChatPosted;

    fn from_world_event(event: &WorldEvent) -> Option<&Self> {
        match event {
            WorldEvent::ChatPosted(e) => Some(e),
            _ => None,
        }
    }
}

impl Event for BlockHit {
    const CATEGORY: EventCategory = EventCategory::BlockHit;

    fn from_world_event(event: &WorldEvent) -> Option<&Self> {
        match event {
            WorldEvent::BlockHit(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PlayerMoved> for WorldEvent {
    fn from(e: PlayerMoved) -> Self {
        WorldEvent::PlayerMoved(e)
    }
}

impl From<ChatPosted> for WorldEvent {
    fn from(e: ChatPosted) -> Self {
        WorldEvent::ChatPosted(e)
    }
}

impl From<BlockHit> for WorldEvent {
    fn from(e: BlockHit) -> Self {
        WorldEvent::BlockHit(e)
    }
}
