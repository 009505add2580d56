use std::sync::LazyLock;

use chia::protocol::Bytes32;
use chia_puzzles::{P2_PARENT, P2_PARENT_HASH};
use clvm_traits::{FromClvm, ToClvm};
use clvm_utils::{CurriedProgram, ToTreeHash, TreeHash};
use clvmr::{serde::node_from_bytes, Allocator, NodePtr};

use crate::{Error, Result};

/// Morpher curried into `p2_parent` for server coins. A morpher of `1` returns
/// the parent's inner puzzle hash unchanged.
pub const MIRROR_MORPHER: u8 = 1;

static MIRROR_PUZZLE_HASH: LazyLock<TreeHash> = LazyLock::new(|| {
    CurriedProgram {
        program: TreeHash::new(P2_PARENT_HASH),
        args: MirrorArgs::default(),
    }
    .tree_hash()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(curry)]
pub struct MirrorArgs {
    pub morpher: u8,
}

impl Default for MirrorArgs {
    fn default() -> Self {
        Self {
            morpher: MIRROR_MORPHER,
        }
    }
}

/// Solution for the mirror puzzle. The parent's puzzle is rerun against
/// `parent_solution`, and the coin asserts that its parent id matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ToClvm, FromClvm)]
#[clvm(list)]
pub struct MirrorSolution<I, S> {
    pub parent_parent_id: Bytes32,
    pub parent_inner_puzzle: I,
    pub parent_amount: u64,
    pub parent_solution: S,
}

#[derive(Debug, Clone, Copy)]
pub struct MirrorPuzzle {
    pub puzzle: NodePtr,
    pub puzzle_hash: Bytes32,
}

/// The puzzle hash every server coin is locked to.
pub fn mirror_puzzle_hash() -> Bytes32 {
    (*MIRROR_PUZZLE_HASH).into()
}

pub fn derive_puzzle(allocator: &mut Allocator) -> Result<MirrorPuzzle> {
    let program = node_from_bytes(allocator, &P2_PARENT)?;

    let puzzle = CurriedProgram {
        program,
        args: MirrorArgs::default(),
    }
    .to_clvm(allocator)?;

    Ok(MirrorPuzzle {
        puzzle,
        puzzle_hash: mirror_puzzle_hash(),
    })
}

pub fn parse_launcher_id(launcher_id: &[u8]) -> Result<Bytes32> {
    let bytes: [u8; 32] = launcher_id.try_into().map_err(|_| {
        Error::InvalidIdentifier(format!("expected 32 bytes, got {}", launcher_id.len()))
    })?;

    Ok(Bytes32::new(bytes))
}

/// The hint for a store is its launcher id plus one, so that server coins can
/// be told apart from the store's own mirror coins.
pub fn derive_hint(launcher_id: &[u8]) -> Result<Bytes32> {
    let mut hint = parse_launcher_id(launcher_id)?.to_bytes();

    for byte in hint.iter_mut().rev() {
        let (value, overflow) = byte.overflowing_add(1);
        *byte = value;

        if !overflow {
            return Ok(Bytes32::new(hint));
        }
    }

    Err(Error::InvalidIdentifier(
        "launcher id is the maximum 32 byte value and has no successor".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use clvm_utils::tree_hash;

    use super::*;

    fn padded(prefix: &[u8], fill: u8) -> [u8; 32] {
        let mut bytes = [fill; 32];
        bytes[..prefix.len()].copy_from_slice(prefix);
        bytes
    }

    #[test]
    fn zero_launcher_id_hints_one() {
        let hint = derive_hint(&[0; 32]).unwrap();

        let mut expected = [0; 32];
        expected[31] = 1;

        assert_eq!(hint, Bytes32::new(expected));
    }

    #[test]
    fn hint_carries_into_higher_bytes() {
        let hint = derive_hint(&padded(&[0x12], 0xff)).unwrap();
        assert_eq!(hint, Bytes32::new(padded(&[0x13], 0x00)));
    }

    #[test]
    fn hint_is_deterministic() {
        let launcher_id = [0x5a; 32];
        let hint = derive_hint(&launcher_id).unwrap();

        assert_eq!(hint, derive_hint(&launcher_id).unwrap());
        assert_eq!(hint.to_bytes().len(), 32);
    }

    #[test]
    fn hint_treats_high_bit_ids_as_unsigned() {
        let mut expected = padded(&[0x80], 0x00);
        expected[31] = 1;

        let hint = derive_hint(&padded(&[0x80], 0x00)).unwrap();
        assert_eq!(hint, Bytes32::new(expected));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            derive_hint(&[0; 31]),
            Err(Error::InvalidIdentifier(_))
        ));
        assert!(matches!(
            derive_hint(&[0; 33]),
            Err(Error::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn rejects_overflowing_id() {
        assert!(matches!(
            derive_hint(&[0xff; 32]),
            Err(Error::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn cached_hash_matches_allocated_puzzle() {
        let mut allocator = Allocator::new();
        let mirror = derive_puzzle(&mut allocator).unwrap();

        assert_eq!(
            Bytes32::from(tree_hash(&allocator, mirror.puzzle)),
            mirror.puzzle_hash
        );
        assert_eq!(mirror.puzzle_hash, mirror_puzzle_hash());
    }
}
