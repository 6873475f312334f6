//! World engine wire protocol.
//!
//! Line oriented, UTF-8, one `\n`-terminated frame per operation:
//!
//! | Direction        | Frame                                   |
//! |------------------|-----------------------------------------|
//! | client → engine  | `name(arg1,arg2,…)`                     |
//! | engine → client  | one response line per request           |
//! | engine → client  | `@<event> <payload>` (unsolicited)      |
//!
//! Responses carry no correlation id: the engine answers requests strictly in
//! the order they were written.  A response of `Fail` or `Fail: <reason>`
//! rejects the corresponding request.
//!
//! ## Event frames
//!
//! | Frame                                    | Event          |
//! |------------------------------------------|----------------|
//! | `@player.moved x0,y0,z0,x1,y1,z1`        | `PlayerMoved`  |
//! | `@chat.posted entityId,message`          | `ChatPosted`   |
//! | `@block.hit x,y,z,face,entityId`         | `BlockHit`     |

use std::str::FromStr;

use crate::blocks::{BlockType, WireBlock};
use crate::error::{Error, Result};
use crate::events::{BlockHit, ChatPosted, PlayerMoved, WorldEvent};
use crate::types::{BlockPos, Position};

/// Leading character of every unsolicited event frame.
pub const EVENT_PREFIX: char = '@';

/// Separator between records in poll-style replies.
pub const RECORD_SEPARATOR: char = '|';

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Every command understood by the engine, as constants.
pub mod commands {
    pub const HANDSHAKE: &str = "connection.handshake";

    pub const SET_BLOCK: &str = "world.setBlock";
    pub const SET_BLOCKS: &str = "world.setBlocks";
    pub const GET_BLOCK_WITH_DATA: &str = "world.getBlockWithData";
    pub const GET_HEIGHT: &str = "world.getHeight";

    pub const PLAYER_GET_POS: &str = "player.getPos";
    pub const PLAYER_SET_POS: &str = "player.setPos";
    pub const PLAYER_GET_TILE: &str = "player.getTile";
    pub const PLAYER_SET_TILE: &str = "player.setTile";

    pub const CHAT_POST: &str = "chat.post";

    /// Poll-style event queries for engines that never push events.
    pub mod poll {
        pub const BLOCK_HITS: &str = "events.block.hits";
        pub const CHAT_POSTS: &str = "events.chat.posts";
    }
}

/// Event frame names (without the `@` prefix).
pub mod event_names {
    pub const PLAYER_MOVED: &str = "player.moved";
    pub const CHAT_POSTED: &str = "chat.posted";
    pub const BLOCK_HIT: &str = "block.hit";
}

// ---------------------------------------------------------------------------
// Outbound frame builders
// ---------------------------------------------------------------------------

/// Build a `name(args…)\n` request frame.
///
/// A line break in the name or any argument would split the request into
/// two frames, so it is refused.
pub fn request_frame(name: &str, args: &[String]) -> Result<String> {
    let has_break = |s: &str| s.contains(['\r', '\n']);
    if let Some(bad) = std::iter::once(name)
        .chain(args.iter().map(String::as_str))
        .find(|s| has_break(s))
    {
        return Err(Error::InvalidFrame {
            command: name.to_string(),
            argument: bad.to_string(),
        });
    }
    Ok(format!("{}({})\n", name, args.join(",")))
}

/// Chat text must stay on one line.
pub fn sanitize_chat(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

pub fn position_args(pos: Position) -> Vec<String> {
    vec![pos.x.to_string(), pos.y.to_string(), pos.z.to_string()]
}

pub fn block_pos_args(pos: BlockPos) -> Vec<String> {
    vec![pos.x.to_string(), pos.y.to_string(), pos.z.to_string()]
}

pub fn wire_block_args(block: WireBlock) -> Vec<String> {
    vec![block.block_type.0.to_string(), block.data.to_string()]
}

// ---------------------------------------------------------------------------
// Inbound frame classification
// ---------------------------------------------------------------------------

/// A single line read from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Answer to the oldest outstanding request.
    Response(String),
    /// Unsolicited event.
    Event(WorldEvent),
}

/// Classify one line (without its terminator).
///
/// Lines starting with [`EVENT_PREFIX`] are events and never consume a
/// pending request, even when malformed.
pub fn classify(line: &str) -> Result<Frame> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(body) = line.strip_prefix(EVENT_PREFIX) else {
        return Ok(Frame::Response(line.to_string()));
    };

    let (name, payload) = body.split_once(' ').unwrap_or((body, ""));
    let bad = || Error::MalformedEvent(line.to_string());

    let event = match name {
        event_names::PLAYER_MOVED => {
            let v: Vec<f64> = parse_fields(payload).ok_or_else(bad)?;
            if v.len() != 6 {
                return Err(bad());
            }
            WorldEvent::PlayerMoved(PlayerMoved {
                from: Position::new(v[0], v[1], v[2]),
                to: Position::new(v[3], v[4], v[5]),
            })
        }
        event_names::CHAT_POSTED => {
            WorldEvent::ChatPosted(parse_chat_record(payload).ok_or_else(bad)?)
        }
        event_names::BLOCK_HIT => {
            WorldEvent::BlockHit(parse_hit_record(payload).ok_or_else(bad)?)
        }
        _ => return Err(bad()),
    };

    Ok(Frame::Event(event))
}

/// `Some(reason)` when the reply rejects its request.
pub fn failure_reason(reply: &str) -> Option<&str> {
    let rest = reply.strip_prefix("Fail")?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix(':').map(str::trim)
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn malformed(command: &str, frame: &str) -> Error {
    Error::MalformedResponse {
        command: command.to_string(),
        frame: frame.to_string(),
    }
}

fn parse_fields<T: FromStr>(s: &str) -> Option<Vec<T>> {
    s.split(',').map(|f| f.trim().parse().ok()).collect()
}

pub fn parse_int(command: &str, frame: &str) -> Result<i32> {
    frame.trim().parse().map_err(|_| malformed(command, frame))
}

pub fn parse_position(command: &str, frame: &str) -> Result<Position> {
    match parse_fields::<f64>(frame).as_deref() {
        Some(&[x, y, z]) => Ok(Position::new(x, y, z)),
        _ => Err(malformed(command, frame)),
    }
}

pub fn parse_block_pos(command: &str, frame: &str) -> Result<BlockPos> {
    match parse_fields::<i32>(frame).as_deref() {
        Some(&[x, y, z]) => Ok(BlockPos::new(x, y, z)),
        _ => Err(malformed(command, frame)),
    }
}

/// `type,data` or bare `type` (data omitted → 0).
pub fn parse_wire_block(command: &str, frame: &str) -> Result<WireBlock> {
    match parse_fields::<u16>(frame).as_deref() {
        Some(&[ty]) => Ok(WireBlock::bare(BlockType(ty))),
        Some(&[ty, data]) => {
            let data = u8::try_from(data).map_err(|_| malformed(command, frame))?;
            Ok(WireBlock::new(BlockType(ty), data))
        }
        _ => Err(malformed(command, frame)),
    }
}

/// `x,y,z,face,entityId|…`; an empty reply means no hits.
pub fn parse_block_hits(command: &str, frame: &str) -> Result<Vec<BlockHit>> {
    records(frame)
        .map(|r| parse_hit_record(r).ok_or_else(|| malformed(command, frame)))
        .collect()
}

/// `entityId,message|…`; an empty reply means no posts.
pub fn parse_chat_posts(command: &str, frame: &str) -> Result<Vec<ChatPosted>> {
    records(frame)
        .map(|r| parse_chat_record(r).ok_or_else(|| malformed(command, frame)))
        .collect()
}

fn records(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .split(RECORD_SEPARATOR)
        .filter(|r| !r.trim().is_empty())
}

fn parse_hit_record(record: &str) -> Option<BlockHit> {
    match parse_fields::<i64>(record).as_deref() {
        Some(&[x, y, z, face, entity_id]) => Some(BlockHit {
            position: BlockPos::new(
                i32::try_from(x).ok()?,
                i32::try_from(y).ok()?,
                i32::try_from(z).ok()?,
            ),
            face: u8::try_from(face).ok()?,
            entity_id,
        }),
        _ => None,
    }
}

fn parse_chat_record(record: &str) -> Option<ChatPosted> {
    let (id, message) = record.split_once(',')?;
    Some(ChatPosted {
        entity_id: id.trim().parse().ok()?,
        message: message.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
