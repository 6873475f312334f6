//! BlockRegistry codec tests

#[cfg(test)]
mod tests {
    use blockwire::blocks::{Air, Cobblestone, Dirt, EndStone, Glowstone, Grass, Snow, Stone, Wool};
    use blockwire::{Block, BlockKind, BlockRegistry, BlockType, Color, Error, Mineral, WireBlock};

    fn roundtrip(registry: &BlockRegistry, block: &dyn Block) -> Box<dyn Block> {
        let wire = registry.encode(block);
        registry.decode_wire(wire).unwrap()
    }

    // -----------------------------------------------------------------------
    // Built-in kinds
    // -----------------------------------------------------------------------

    #[test]
    fn standard_registry_knows_every_builtin() {
        let registry = BlockRegistry::standard();
        let types: Vec<_> = registry.types().collect();
        assert_eq!(
            types,
            vec![
                BlockType::AIR,
                BlockType::STONE,
                BlockType::GRASS,
                BlockType::DIRT,
                BlockType::COBBLESTONE,
                BlockType::WOOL,
                BlockType::SNOW_LAYER,
                BlockType::GLOWSTONE,
                BlockType::END_STONE,
            ]
        );
        assert_eq!(registry.name_of(BlockType::WOOL), Some("wool"));
        assert!(BlockRegistry::new().is_empty());
    }

    #[test]
    fn every_named_variant_survives_encode_decode() {
        let registry = BlockRegistry::standard();

        for mineral in Mineral::all() {
            let block = Stone::new(mineral);
            let back = roundtrip(&registry, &block);
            assert_eq!(back.downcast_ref::<Stone>(), Some(&block));
        }
        for color in Color::all() {
            let block = Wool::new(color);
            let back = roundtrip(&registry, &block);
            assert_eq!(back.downcast_ref::<Wool>(), Some(&block));
        }
        for thickness in 0..=Snow::MAX_THICKNESS {
            let block = Snow::new(thickness);
            let back = roundtrip(&registry, &block);
            assert_eq!(back.downcast_ref::<Snow>(), Some(&block));
        }

        let bare: [&dyn Block; 6] = [&Air, &Grass, &Dirt, &Cobblestone, &Glowstone, &EndStone];
        for block in bare {
            let back = roundtrip(&registry, block);
            assert!(*back == *block, "{} did not survive", block.name());
            assert_eq!(back.data(), 0);
        }
    }

    #[test]
    fn wire_encoding_matches_engine_ids() {
        let registry = BlockRegistry::standard();
        assert_eq!(
            registry.encode(&Wool::new(Color::RED)),
            WireBlock::new(BlockType(35), 14)
        );
        assert_eq!(
            registry.encode(&Stone::new(Mineral::SMOOTH_ANDESITE)),
            WireBlock::new(BlockType(1), 6)
        );
        assert_eq!(registry.encode(&Glowstone), WireBlock::new(BlockType(89), 0));
    }

    // -----------------------------------------------------------------------
    // Data byte edge cases
    // -----------------------------------------------------------------------

    #[test]
    fn missing_data_byte_means_zero() {
        let registry = BlockRegistry::standard();
        let stone = registry.decode(BlockType::STONE, None).unwrap();
        assert_eq!(stone.downcast_ref::<Stone>().map(|s| s.mineral), Some(Mineral::STONE));

        let wool = registry.decode(BlockType::WOOL, None).unwrap();
        assert_eq!(wool.downcast_ref::<Wool>().map(|w| w.color), Some(Color::WHITE));
    }

    #[test]
    fn unnamed_data_byte_is_carried_through() {
        let registry = BlockRegistry::standard();
        let block = registry.decode(BlockType::STONE, Some(0x20)).unwrap();
        let stone = block.downcast_ref::<Stone>().unwrap();
        assert_eq!(stone.mineral, Mineral(0x20));
        assert!(!stone.mineral.is_known());
        assert_eq!(registry.encode(block.as_ref()), WireBlock::new(BlockType::STONE, 0x20));
    }

    #[test]
    fn kinds_without_variants_ignore_the_data_byte() {
        let registry = BlockRegistry::standard();
        for data in [None, Some(0), Some(7), Some(255)] {
            let block = registry.decode(BlockType::END_STONE, data).unwrap();
            assert!(block.is::<EndStone>());
            assert_eq!(block.data(), 0);
        }
    }

    // -----------------------------------------------------------------------
    // Open registration
    // -----------------------------------------------------------------------

    #[test]
    fn unknown_type_is_rejected() {
        let registry = BlockRegistry::standard();
        let err = registry.decode(BlockType(999), Some(0)).unwrap_err();
        assert_eq!(err, Error::UnknownBlockType(BlockType(999)));
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Lantern {
        hanging: bool,
    }

    impl BlockKind for Lantern {
        const TYPE: BlockType = BlockType(4000);
        const NAME: &'static str = "lantern";

        fn to_data(&self) -> u8 {
            self.hanging as u8
        }

        fn from_data(data: Option<u8>) -> Self {
            Lantern {
                hanging: data.unwrap_or(0) & 1 == 1,
            }
        }
    }

    #[test]
    fn third_party_kind_decodes_after_registration() {
        let mut registry = BlockRegistry::standard();
        assert!(registry.decode(Lantern::TYPE, Some(1)).is_err());

        registry.register::<Lantern>().unwrap();
        let block = registry.decode(Lantern::TYPE, Some(1)).unwrap();
        assert_eq!(block.downcast_ref::<Lantern>(), Some(&Lantern { hanging: true }));
        assert_eq!(block.name(), "lantern");

        // Existing kinds are untouched.
        assert!(registry.decode(BlockType::GRASS, None).unwrap().is::<Grass>());
    }

    #[test]
    fn duplicate_registration_keeps_the_original() {
        let mut registry = BlockRegistry::standard();
        let err = registry.register::<Wool>().unwrap_err();
        assert_eq!(err, Error::DuplicateBlockType(BlockType::WOOL));
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.name_of(BlockType::WOOL), Some("wool"));
    }
}
