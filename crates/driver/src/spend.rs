use chia::{
    bls::{PublicKey, Signature},
    protocol::{Bytes32, Coin, CoinSpend, Program, SpendBundle},
    puzzles::standard::{StandardArgs, StandardSolution},
};
use chia_puzzles::P2_DELEGATED_PUZZLE_OR_HIDDEN_PUZZLE;
use clvm_traits::{FromClvm, ToClvm};
use clvm_utils::CurriedProgram;
use clvmr::{serde::node_from_bytes, Allocator, NodePtr};
use indexmap::IndexMap;
use server_coin_types::CoinRecord;

use crate::{
    compute_change, derive_hint, derive_puzzle, encode_change, encode_create_server_coin,
    mirror_puzzle_hash, select_coins, Error, MirrorSolution, Result,
};

/// Puzzle reveals the wallet can prove ownership of, keyed by puzzle hash.
#[derive(Debug, Default, Clone)]
pub struct PuzzleCache {
    puzzles: IndexMap<Bytes32, Program>,
}

impl PuzzleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, puzzle_hash: Bytes32, puzzle: Program) {
        self.puzzles.insert(puzzle_hash, puzzle);
    }

    /// Adds the standard `p2_delegated_puzzle_or_hidden_puzzle` for a
    /// synthetic key and returns its puzzle hash.
    pub fn insert_standard(
        &mut self,
        allocator: &mut Allocator,
        synthetic_key: PublicKey,
    ) -> Result<Bytes32> {
        let puzzle_hash: Bytes32 = StandardArgs::curry_tree_hash(synthetic_key).into();
        let puzzle = standard_puzzle(allocator, synthetic_key)?;
        self.insert(puzzle_hash, Program::from_clvm(allocator, puzzle)?);
        Ok(puzzle_hash)
    }

    pub fn get(&self, puzzle_hash: &Bytes32) -> Option<&Program> {
        self.puzzles.get(puzzle_hash)
    }

    pub fn contains(&self, puzzle_hash: &Bytes32) -> bool {
        self.puzzles.contains_key(puzzle_hash)
    }

    pub fn puzzle_hashes(&self) -> impl Iterator<Item = Bytes32> + '_ {
        self.puzzles.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }
}

pub fn standard_puzzle(allocator: &mut Allocator, synthetic_key: PublicKey) -> Result<NodePtr> {
    let program = node_from_bytes(allocator, &P2_DELEGATED_PUZZLE_OR_HIDDEN_PUZZLE)?;

    Ok(CurriedProgram {
        program,
        args: StandardArgs::new(synthetic_key),
    }
    .to_clvm(allocator)?)
}

#[derive(Debug, Clone)]
pub struct CreateSpend {
    pub launcher_id: Bytes32,
    pub urls: Vec<String>,
    pub amount: u64,
    pub fee: u64,
    pub change_puzzle_hash: Bytes32,
}

#[derive(Debug, Clone)]
pub struct DeleteSpend {
    /// The server coin being revoked.
    pub coin: Coin,
    /// The spend that created `coin`, as revealed by the ledger.
    pub parent: CoinSpend,
    pub fee: u64,
    pub change_puzzle_hash: Bytes32,
}

/// Builds an unsigned bundle that locks `amount` under the mirror puzzle with
/// the store's hint and URLs as memos.
pub fn build_create(
    allocator: &mut Allocator,
    spend: &CreateSpend,
    funding_coins: &[CoinRecord],
    cache: &PuzzleCache,
) -> Result<SpendBundle> {
    if spend.urls.is_empty() {
        return Err(Error::NoUrls);
    }

    let hint = derive_hint(&spend.launcher_id.to_bytes())?;
    let mirror_puzzle_hash = mirror_puzzle_hash();

    let selected = select_coins(funding_coins, spend.amount.saturating_add(spend.fee))?;
    let change = compute_change(&selected, spend.fee, spend.amount)?;

    let mut coin_spends = Vec::with_capacity(selected.len());

    for (index, record) in selected.iter().enumerate() {
        let conditions = if index == 0 {
            vec![
                encode_create_server_coin(mirror_puzzle_hash, spend.amount, hint, &spend.urls)
                    .to_clvm(allocator)?,
                encode_change(spend.change_puzzle_hash, change).to_clvm(allocator)?,
            ]
        } else {
            Vec::new()
        };

        coin_spends.push(standard_spend(allocator, cache, record.coin, conditions)?);
    }

    Ok(SpendBundle::new(coin_spends, Signature::default()))
}

/// Builds an unsigned bundle that spends a server coin without recreating it.
/// The locked amount is returned with the change.
pub fn build_delete(
    allocator: &mut Allocator,
    spend: &DeleteSpend,
    funding_coins: &[CoinRecord],
    cache: &PuzzleCache,
) -> Result<SpendBundle> {
    let mirror = derive_puzzle(allocator)?;

    if spend.coin.puzzle_hash != mirror.puzzle_hash {
        return Err(Error::NotServerCoin(spend.coin.coin_id()));
    }

    let selected = select_coins(funding_coins, spend.fee.saturating_add(1))?;
    let change = compute_change(&selected, spend.fee, 0)?;
    let change = change
        .checked_add(spend.coin.amount)
        .ok_or(Error::ChangeOverflow {
            change,
            returned: spend.coin.amount,
        })?;

    let mut coin_spends = Vec::with_capacity(selected.len() + 1);

    for (index, record) in selected.iter().enumerate() {
        let conditions = if index == 0 {
            vec![encode_change(spend.change_puzzle_hash, change).to_clvm(allocator)?]
        } else {
            Vec::new()
        };

        coin_spends.push(standard_spend(allocator, cache, record.coin, conditions)?);
    }

    let parent_inner_puzzle = spend.parent.puzzle_reveal.to_clvm(allocator)?;

    let solution = MirrorSolution {
        parent_parent_id: spend.parent.coin.parent_coin_info,
        parent_inner_puzzle,
        parent_amount: spend.parent.coin.amount,
        parent_solution: StandardSolution::from_conditions(()),
    }
    .to_clvm(allocator)?;

    coin_spends.push(CoinSpend::new(
        spend.coin,
        Program::from_clvm(allocator, mirror.puzzle)?,
        Program::from_clvm(allocator, solution)?,
    ));

    Ok(SpendBundle::new(coin_spends, Signature::default()))
}

fn standard_spend(
    allocator: &mut Allocator,
    cache: &PuzzleCache,
    coin: Coin,
    conditions: Vec<NodePtr>,
) -> Result<CoinSpend> {
    let puzzle_reveal = cache
        .get(&coin.puzzle_hash)
        .ok_or(Error::UnknownPuzzle(coin.puzzle_hash))?
        .clone();

    let solution = StandardSolution::from_conditions(conditions).to_clvm(allocator)?;

    Ok(CoinSpend::new(
        coin,
        puzzle_reveal,
        Program::from_clvm(allocator, solution)?,
    ))
}
