//! The opcode catalogue shared by the assembler and the emulator.
//!
//! This crate has no logic of its own: `build.rs` reads `opcodes.json` and
//! generates `src/opcodes.rs`, which this module re-exports. Keeping the
//! catalogue in one generated place is what prevents the assembler and the
//! emulator from disagreeing about an opcode's shape or size.

include!("opcodes.rs");

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn catalogue_is_dense() {
        for (index, info) in CATALOGUE.iter().enumerate() {
            assert_eq!(index as u8, info.opcode);
        }
    }

    #[test]
    fn from_u8_round_trips_through_catalogue() {
        for info in CATALOGUE.iter() {
            let op = Opcode::from(info.opcode);
            assert_eq!(op.shape(), info.shape);
            assert_eq!(op.encoded_size(), info.size);
            assert_eq!(op.is_reserved(), info.reserved);
        }
    }

    #[test]
    fn mnemonic_lookup_is_case_insensitive() {
        assert_eq!(Opcode::from_mnemonic("halt"), Some(Opcode::Halt));
        assert_eq!(Opcode::from_mnemonic("HALT"), Some(Opcode::Halt));
        assert_eq!(Opcode::from_mnemonic("HaLt"), Some(Opcode::Halt));
    }

    #[test]
    fn reserved_bytes_have_no_mnemonic() {
        assert_eq!(Opcode::from_mnemonic("UNASSIGNED_29"), None);
        assert!(Opcode::from(0x29).is_reserved());
    }

    #[test]
    fn display_prints_mnemonic() {
        assert_eq!(format!("{}", Opcode::Add), "ADD");
        assert_eq!(format!("{}", Opcode::LoadImm64), "LOAD_IMM64");
    }
}
