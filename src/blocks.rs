//! Block variant model.
//!
//! A *kind* is a concrete Rust type implementing [`BlockKind`]: it names its
//! wire [`BlockType`] and says how its sub-variant (if any) maps to the data
//! byte.  Every kind is usable as a `dyn Block`, which is what the codec
//! registry hands back when decoding.
//!
//! Third-party kinds are added by implementing [`BlockKind`] and registering
//! the type with a [`BlockRegistry`](crate::registry::BlockRegistry); nothing
//! in this module needs to change.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

// ---------------------------------------------------------------------------
// Wire identifiers
// ---------------------------------------------------------------------------

/// Wire-level identifier of a block kind.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BlockType(pub u16);

impl BlockType {
    pub const AIR: BlockType = BlockType(0);
    pub const STONE: BlockType = BlockType(1);
    pub const GRASS: BlockType = BlockType(2);
    pub const DIRT: BlockType = BlockType(3);
    pub const COBBLESTONE: BlockType = BlockType(4);
    pub const WOOL: BlockType = BlockType(35);
    pub const SNOW_LAYER: BlockType = BlockType(78);
    pub const GLOWSTONE: BlockType = BlockType(89);
    pub const END_STONE: BlockType = BlockType(121);

    pub const fn id(self) -> u16 {
        self.0
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The engine-facing form of a block: type id plus one data byte.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct WireBlock {
    pub block_type: BlockType,
    pub data: u8,
}

impl WireBlock {
    pub fn new(block_type: BlockType, data: u8) -> Self {
        Self { block_type, data }
    }

    /// A wire block with the data byte omitted (zero).
    pub fn bare(block_type: BlockType) -> Self {
        Self::new(block_type, 0)
    }
}

impl fmt::Display for WireBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_type.0, self.data)
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A block kind with a fixed wire type and an optional sub-variant.
///
/// Kinds without a sub-variant keep the default `to_data` (always `0`) and
/// ignore the byte in `from_data`.
pub trait BlockKind: Any + fmt::Debug + Clone + PartialEq + Send + Sync {
    const TYPE: BlockType;
    const NAME: &'static str;

    fn to_data(&self) -> u8 {
        0
    }

    /// Build the kind from a data byte.  `None` means the byte was omitted
    /// and must behave as zero.  Must accept every byte value.
    fn from_data(data: Option<u8>) -> Self;
}

/// Object-safe view over any [`BlockKind`].
///
/// Implemented for every kind by a blanket impl; do not implement directly.
pub trait Block: Any + fmt::Debug + Send + Sync {
    fn block_type(&self) -> BlockType;
    fn name(&self) -> &'static str;
    fn data(&self) -> u8;

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn Block) -> bool;
    fn clone_box(&self) -> Box<dyn Block>;
}

impl<K: BlockKind> Block for K {
    fn block_type(&self) -> BlockType {
        K::TYPE
    }

    fn name(&self) -> &'static str {
        K::NAME
    }

    fn data(&self) -> u8 {
        self.to_data()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Block) -> bool {
        other
            .as_any()
            .downcast_ref::<K>()
            .map_or(false, |other| self == other)
    }

    fn clone_box(&self) -> Box<dyn Block> {
        Box::new(self.clone())
    }
}

impl dyn Block {
    pub fn downcast_ref<K: BlockKind>(&self) -> Option<&K> {
        self.as_any().downcast_ref::<K>()
    }

    pub fn is<K: BlockKind>(&self) -> bool {
        self.as_any().is::<K>()
    }

    pub fn to_wire(&self) -> WireBlock {
        WireBlock::new(self.block_type(), self.data())
    }
}

impl PartialEq for dyn Block {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other)
    }
}

impl PartialEq<&Self> for Box<dyn Block> {
    fn eq(&self, other: &&Self) -> bool {
        self.dyn_eq(other.as_ref())
    }
}

impl Clone for Box<dyn Block> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// ---------------------------------------------------------------------------
// Sub-variants
// ---------------------------------------------------------------------------

/// Stone mineral.  Bytes without a named constant are carried unchanged so
/// newer engines can introduce minerals without breaking decoding.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
pub struct Mineral(pub u8);

impl Mineral {
    pub const STONE: Mineral = Mineral(0);
    pub const GRANITE: Mineral = Mineral(1);
    pub const SMOOTH_GRANITE: Mineral = Mineral(2);
    pub const DIORITE: Mineral = Mineral(3);
    pub const SMOOTH_DIORITE: Mineral = Mineral(4);
    pub const ANDESITE: Mineral = Mineral(5);
    pub const SMOOTH_ANDESITE: Mineral = Mineral(6);

    const NAMES: [&'static str; 7] = [
        "stone",
        "granite",
        "smooth_granite",
        "diorite",
        "smooth_diorite",
        "andesite",
        "smooth_andesite",
    ];

    /// Named minerals in wire order.
    pub fn all() -> impl Iterator<Item = Mineral> {
        (0..Self::NAMES.len() as u8).map(Mineral)
    }

    pub fn name(self) -> Option<&'static str> {
        Self::NAMES.get(self.0 as usize).copied()
    }

    pub fn is_known(self) -> bool {
        self.name().is_some()
    }
}

impl From<u8> for Mineral {
    fn from(b: u8) -> Self {
        Mineral(b)
    }
}

impl From<Mineral> for u8 {
    fn from(m: Mineral) -> Self {
        m.0
    }
}

impl fmt::Display for Mineral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "mineral({:#04x})", self.0),
        }
    }
}

/// Dye colour used by wool.  Same permissive contract as [`Mineral`].
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize, Default)]
pub struct Color(pub u8);

impl Color {
    pub const WHITE: Color = Color(0);
    pub const ORANGE: Color = Color(1);
    pub const MAGENTA: Color = Color(2);
    pub const LIGHT_BLUE: Color = Color(3);
    pub const YELLOW: Color = Color(4);
    pub const LIME: Color = Color(5);
    pub const PINK: Color = Color(6);
    pub const GRAY: Color = Color(7);
    pub const LIGHT_GRAY: Color = Color(8);
    pub const CYAN: Color = Color(9);
    pub const PURPLE: Color = Color(10);
    pub const BLUE: Color = Color(11);
    pub const BROWN: Color = Color(12);
    pub const GREEN: Color = Color(13);
    pub const RED: Color = Color(14);
    pub const BLACK: Color = Color(15);

    const NAMES: [&'static str; 16] = [
        "white",
        "orange",
        "magenta",
        "light_blue",
        "yellow",
        "lime",
        "pink",
        "gray",
        "light_gray",
        "cyan",
        "purple",
        "blue",
        "brown",
        "green",
        "red",
        "black",
    ];

    pub fn all() -> impl Iterator<Item = Color> {
        (0..Self::NAMES.len() as u8).map(Color)
    }

    pub fn name(self) -> Option<&'static str> {
        Self::NAMES.get(self.0 as usize).copied()
    }

    pub fn is_known(self) -> bool {
        self.name().is_some()
    }
}

impl From<u8> for Color {
    fn from(b: u8) -> Self {
        Color(b)
    }
}

impl From<Color> for u8 {
    fn from(c: Color) -> Self {
        c.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "color({:#04x})", self.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in kinds
// ---------------------------------------------------------------------------

/// Declare a kind with no sub-variant.
macro_rules! bare_block {
    ($(#[$meta:meta])* $kind:ident, $ty:expr, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $kind;

        impl BlockKind for $kind {
            const TYPE: BlockType = $ty;
            const NAME: &'static str = $name;

            fn from_data(_data: Option<u8>) -> Self {
                $kind
            }
        }
    };
}

bare_block!(Air, BlockType::AIR, "air");
bare_block!(Grass, BlockType::GRASS, "grass");
bare_block!(Dirt, BlockType::DIRT, "dirt");
bare_block!(Cobblestone, BlockType::COBBLESTONE, "cobblestone");
bare_block!(Glowstone, BlockType::GLOWSTONE, "glowstone");
bare_block!(EndStone, BlockType::END_STONE, "end_stone");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Stone {
    pub mineral: Mineral,
}

impl Stone {
    pub fn new(mineral: Mineral) -> Self {
        Self { mineral }
    }
}

impl BlockKind for Stone {
    const TYPE: BlockType = BlockType::STONE;
    const NAME: &'static str = "stone";

    fn to_data(&self) -> u8 {
        self.mineral.into()
    }

    fn from_data(data: Option<u8>) -> Self {
        Self::new(Mineral(data.unwrap_or(0)))
    }
}

/// A snow layer.  `thickness` is 0–8 in the engine; other values are passed
/// through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Snow {
    pub thickness: u8,
}

impl Snow {
    pub const MAX_THICKNESS: u8 = 8;

    pub fn new(thickness: u8) -> Self {
        Self { thickness }
    }
}

impl BlockKind for Snow {
    const TYPE: BlockType = BlockType::SNOW_LAYER;
    const NAME: &'static str = "snow_layer";

    fn to_data(&self) -> u8 {
        self.thickness
    }

    fn from_data(data: Option<u8>) -> Self {
        Self::new(data.unwrap_or(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Wool {
    pub color: Color,
}

impl Wool {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl BlockKind for Wool {
    const TYPE: BlockType = BlockType::WOOL;
    const NAME: &'static str = "wool";

    fn to_data(&self) -> u8 {
        self.color.into()
    }

    fn from_data(data: Option<u8>) -> Self {
        Self::new(Color(data.unwrap_or(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dyn_equality_compares_kind_and_value() {
        let a: Box<dyn Block> = Box::new(Stone::new(Mineral::GRANITE));
        let b: Box<dyn Block> = Box::new(Stone::new(Mineral::GRANITE));
        let c: Box<dyn Block> = Box::new(Stone::new(Mineral::DIORITE));
        let d: Box<dyn Block> = Box::new(Grass);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn downcast_recovers_concrete_kind() {
        let block: Box<dyn Block> = Box::new(Snow::new(3));
        assert!(block.is::<Snow>());
        assert_eq!(block.downcast_ref::<Snow>(), Some(&Snow::new(3)));
        assert!(block.downcast_ref::<Stone>().is_none());
    }

    #[test]
    fn bare_kinds_encode_zero() {
        let glowstone: &dyn Block = &Glowstone;
        assert_eq!(glowstone.to_wire(), WireBlock::bare(BlockType::GLOWSTONE));
        assert_eq!(EndStone.data(), 0);
    }

    #[test]
    fn unknown_mineral_displays_raw_byte() {
        assert_eq!(Mineral::SMOOTH_ANDESITE.to_string(), "smooth_andesite");
        assert_eq!(Mineral(0x20).to_string(), "mineral(0x20)");
        assert!(!Mineral(0x20).is_known());
    }
}
