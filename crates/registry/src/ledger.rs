use std::{future::Future, sync::Arc};

use chia::protocol::{Bytes32, CoinSpend, SpendBundle};
use server_coin_types::CoinRecord;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected(String),
}

/// Read and submit access to the coin set.
pub trait Ledger: Send + Sync {
    /// Unspent coins carrying `hint` as their first memo.
    fn coin_records_by_hint(
        &self,
        hint: Bytes32,
    ) -> impl Future<Output = Result<Vec<CoinRecord>>> + Send;

    fn coin_record(
        &self,
        coin_id: Bytes32,
    ) -> impl Future<Output = Result<Option<CoinRecord>>> + Send;

    /// The revealed puzzle and solution of a coin spent at `height`.
    fn puzzle_and_solution(
        &self,
        coin_id: Bytes32,
        height: u32,
    ) -> impl Future<Output = Result<Option<CoinSpend>>> + Send;

    fn unspent_coins(
        &self,
        puzzle_hashes: Vec<Bytes32>,
    ) -> impl Future<Output = Result<Vec<CoinRecord>>> + Send;

    fn submit(&self, bundle: SpendBundle) -> impl Future<Output = Result<SubmitOutcome>> + Send;
}

impl<L: Ledger> Ledger for Arc<L> {
    fn coin_records_by_hint(
        &self,
        hint: Bytes32,
    ) -> impl Future<Output = Result<Vec<CoinRecord>>> + Send {
        (**self).coin_records_by_hint(hint)
    }

    fn coin_record(
        &self,
        coin_id: Bytes32,
    ) -> impl Future<Output = Result<Option<CoinRecord>>> + Send {
        (**self).coin_record(coin_id)
    }

    fn puzzle_and_solution(
        &self,
        coin_id: Bytes32,
        height: u32,
    ) -> impl Future<Output = Result<Option<CoinSpend>>> + Send {
        (**self).puzzle_and_solution(coin_id, height)
    }

    fn unspent_coins(
        &self,
        puzzle_hashes: Vec<Bytes32>,
    ) -> impl Future<Output = Result<Vec<CoinRecord>>> + Send {
        (**self).unspent_coins(puzzle_hashes)
    }

    fn submit(&self, bundle: SpendBundle) -> impl Future<Output = Result<SubmitOutcome>> + Send {
        (**self).submit(bundle)
    }
}
