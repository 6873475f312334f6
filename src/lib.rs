//! Blockwire
//!
//! Typed block model and async client for voxel engines that speak the
//! line-oriented world protocol (`world.setBlock(…)`, `player.getPos()`, …).
//!
//! ## Architecture
//!
//! ```text
//! Connection  (connection.rs)  ← handshake, FIFO request correlation, reader
//!   ├── Subscribers  (subscription.rs) ← per-category handler tables, dispatch
//!   ├── poller       (poller.rs)       ← optional event polling
//!   └── BlockRegistry (registry.rs)    ← BlockType ↔ block kind
//!         └── Block / BlockKind (blocks.rs)
//! ```
//!
//! The block model, codec registry, event types and wire grammar are always
//! available.  The network client requires the `client` feature (default).

// Data model and codec are always available (no client feature needed).
pub mod blocks;
pub mod error;
pub mod events;
pub mod protocol;
pub mod registry;
pub mod types;

// Network client modules require the `client` feature.
#[cfg(feature = "client")]
pub mod connection;
#[cfg(feature = "client")]
pub mod poller;
#[cfg(feature = "client")]
pub mod subscription;

pub use blocks::{Block, BlockKind, BlockType, Color, Mineral, WireBlock};
pub use error::{Error, Result};
pub use events::{BlockHit, ChatPosted, Event, EventCategory, PlayerMoved, WorldEvent};
pub use registry::BlockRegistry;
pub use types::{BlockPos, ClientConfig, Direction, Position};

// Convenience re-exports (client only)
#[cfg(feature = "client")]
pub use connection::{Connection, ConnectionState, WeakConnection};
#[cfg(feature = "client")]
pub use subscription::SubscriptionId;
