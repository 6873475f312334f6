//! Error taxonomy for the codec and the world client.

use thiserror::Error;

use crate::blocks::BlockType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Transport or handshake failure while establishing a session.
    #[error("failed to connect to world engine at {address}: {reason}")]
    FailedToConnect { address: String, reason: String },

    /// The session ended while the command was outstanding, or before it was sent.
    #[error("connection to world engine lost")]
    ConnectionLost,

    #[error("unknown block type {0}")]
    UnknownBlockType(BlockType),

    #[error("block type {0} is already registered")]
    DuplicateBlockType(BlockType),

    /// The engine answered, but not in a shape the command understands.
    #[error("malformed response to {command}: {frame:?}")]
    MalformedResponse { command: String, frame: String },

    /// The engine explicitly rejected the command.
    #[error("{command} failed: {reply}")]
    CommandFailed { command: String, reply: String },

    /// A request would not fit on one line.
    #[error("{command}: line break in {argument:?}")]
    InvalidFrame { command: String, argument: String },

    #[error("malformed event frame: {0:?}")]
    MalformedEvent(String),
}

pub type Result<T> = std::result::Result<T, Error>;
