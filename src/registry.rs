//! Block codec registry: `BlockType` ↔ block kind.
//!
//! Decoding dispatches purely on the wire type through a map of codecs, so
//! adding a kind is one [`BlockRegistry::register`] call and never touches
//! existing entries.

use log::debug;
use std::collections::HashMap;

use crate::blocks::{
    Air, Block, BlockKind, BlockType, Cobblestone, Dirt, EndStone, Glowstone, Grass, Snow, Stone,
    WireBlock, Wool,
};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Codec entry
// ---------------------------------------------------------------------------

type DecodeFn = fn(Option<u8>) -> Box<dyn Block>;

#[derive(Debug, Clone, Copy)]
struct Codec {
    name: &'static str,
    decode: DecodeFn,
}

fn decode_kind<K: BlockKind>(data: Option<u8>) -> Box<dyn Block> {
    Box::new(K::from_data(data))
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Open mapping from wire type to decoder.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    codecs: HashMap<BlockType, Codec>,
}

impl BlockRegistry {
    /// An empty registry.  Most callers want [`BlockRegistry::standard`].
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Registry preloaded with every built-in kind.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.insert::<Air>();
        registry.insert::<Stone>();
        registry.insert::<Grass>();
        registry.insert::<Dirt>();
        registry.insert::<Cobblestone>();
        registry.insert::<Wool>();
        registry.insert::<Snow>();
        registry.insert::<Glowstone>();
        registry.insert::<EndStone>();
        registry
    }

    /// Add kind `K`.  Fails if its wire type is already taken; the existing
    /// mapping is kept.
    pub fn register<K: BlockKind>(&mut self) -> Result<()> {
        if self.codecs.contains_key(&K::TYPE) {
            return Err(Error::DuplicateBlockType(K::TYPE));
        }
        self.insert::<K>();
        debug!("Registered block kind '{}' as {}", K::NAME, K::TYPE);
        Ok(())
    }

    fn insert<K: BlockKind>(&mut self) {
        self.codecs.insert(
            K::TYPE,
            Codec {
                name: K::NAME,
                decode: decode_kind::<K>,
            },
        );
    }

    /// Encode a block for the wire.  Never fails: the block carries its own
    /// type and data byte, registered or not.
    pub fn encode(&self, block: &dyn Block) -> WireBlock {
        block.to_wire()
    }

    /// Decode `(block_type, data)`.  `data == None` behaves as zero.
    ///
    /// Only an unregistered type is an error; any data byte is accepted for
    /// a registered one.
    pub fn decode(&self, block_type: BlockType, data: Option<u8>) -> Result<Box<dyn Block>> {
        let codec = self
            .codecs
            .get(&block_type)
            .ok_or(Error::UnknownBlockType(block_type))?;
        Ok((codec.decode)(data))
    }

    pub fn decode_wire(&self, wire: WireBlock) -> Result<Box<dyn Block>> {
        self.decode(wire.block_type, Some(wire.data))
    }

    pub fn contains(&self, block_type: BlockType) -> bool {
        self.codecs.contains_key(&block_type)
    }

    pub fn name_of(&self, block_type: BlockType) -> Option<&'static str> {
        self.codecs.get(&block_type).map(|c| c.name)
    }

    /// Registered types in ascending id order.
    pub fn types(&self) -> impl Iterator<Item = BlockType> {
        let mut types: Vec<_> = self.codecs.keys().copied().collect();
        types.sort();
        types.into_iter()
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
