use std::{future::Future, time::Duration};

use chia::protocol::{Bytes32, CoinSpend, SpendBundle};
use chia_wallet_sdk::signer::AggSigConstants;
use clvmr::Allocator;
use futures::{stream, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use itertools::Itertools;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use server_coin_driver::{
    build_create, build_delete, derive_hint, mirror_puzzle_hash, parse_launcher_id,
    replay_server_coins, ClvmRunner, CreateSpend, DeleteSpend, Error as DriverError,
    PuzzleRunner,
};
use server_coin_types::{CoinRecord, ServerRecord};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{Error, FeeEstimator, Ledger, Result, SubmitOutcome, Wallet};

/// The id of a submitted spend bundle.
pub type TransactionId = Bytes32;

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Upper bound on every ledger, wallet and fee estimator call.
    pub timeout: Duration,
    /// Parent spends fetched at once while querying.
    pub query_concurrency: usize,
    pub constants: AggSigConstants,
}

impl RegistryConfig {
    pub fn new(constants: AggSigConstants) -> Self {
        Self {
            timeout: Duration::from_secs(30),
            query_concurrency: 8,
            constants,
        }
    }
}

pub struct Registry<L, W, F, R = ClvmRunner> {
    ledger: L,
    wallet: W,
    fees: F,
    runner: R,
    config: RegistryConfig,
}

impl<L, W, F> Registry<L, W, F> {
    pub fn new(ledger: L, wallet: W, fees: F, config: RegistryConfig) -> Self {
        Self::with_runner(ledger, wallet, fees, ClvmRunner, config)
    }
}

impl<L, W, F, R> Registry<L, W, F, R> {
    pub fn with_runner(ledger: L, wallet: W, fees: F, runner: R, config: RegistryConfig) -> Self {
        Self {
            ledger,
            wallet,
            fees,
            runner,
            config,
        }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }
}

impl<L, W, F, R> Registry<L, W, F, R>
where
    L: Ledger,
    W: Wallet,
    F: FeeEstimator,
    R: PuzzleRunner + Send + Sync,
{
    /// Locks `amount` mojos in a new server coin advertising `urls` for the
    /// store `launcher_id`.
    pub async fn create(
        &self,
        launcher_id: &[u8],
        urls: &[String],
        amount: u64,
        fee: Option<u64>,
    ) -> Result<TransactionId> {
        // Bad input is rejected before any collaborator is called.
        derive_hint(launcher_id)?;
        let launcher_id = parse_launcher_id(launcher_id)?;

        if urls.is_empty() {
            return Err(DriverError::NoUrls.into());
        }

        let fee = self.resolve_fee(fee).await?;

        let coins = self
            .bounded(
                "spendable coins",
                self.wallet.spendable_coins(amount.saturating_add(fee)),
            )
            .await?;

        let bundle = build_create(
            &mut Allocator::new(),
            &CreateSpend {
                launcher_id,
                urls: urls.to_vec(),
                amount,
                fee,
                change_puzzle_hash: self.wallet.change_puzzle_hash(),
            },
            &coins,
            self.wallet.puzzle_cache(),
        )?;

        debug!(
            "Creating server coin for {launcher_id} with {} urls, {amount} mojos and a fee of {fee}",
            urls.len()
        );

        self.sign_and_submit(bundle).await
    }

    /// Spends a server coin without recreating it, returning its value to the
    /// wallet.
    pub async fn delete(&self, coin_id: Bytes32, fee: Option<u64>) -> Result<TransactionId> {
        let record = self
            .bounded("coin record", self.ledger.coin_record(coin_id))
            .await?
            .ok_or(Error::CoinNotFound(coin_id))?;

        let parent = self.parent_spend(record).await?;

        let fee = self.resolve_fee(fee).await?;

        let coins = self
            .bounded(
                "spendable coins",
                self.wallet.spendable_coins(fee.saturating_add(1)),
            )
            .await?;

        let bundle = build_delete(
            &mut Allocator::new(),
            &DeleteSpend {
                coin: record.coin,
                parent,
                fee,
                change_puzzle_hash: self.wallet.change_puzzle_hash(),
            },
            &coins,
            self.wallet.puzzle_cache(),
        )?;

        debug!("Deleting server coin {coin_id} with a fee of {fee}");

        self.sign_and_submit(bundle).await
    }

    /// Finds every live server coin for `launcher_id`.
    pub async fn query(&self, launcher_id: &[u8]) -> Result<Vec<ServerRecord>> {
        let hint = derive_hint(launcher_id)?;
        let launcher_id = parse_launcher_id(launcher_id)?;
        let mirror_puzzle_hash = mirror_puzzle_hash();

        let hinted = self
            .bounded("hinted coins", self.ledger.coin_records_by_hint(hint))
            .await?;

        let candidates: IndexMap<Bytes32, CoinRecord> = hinted
            .into_iter()
            .filter(|record| record.coin.puzzle_hash == mirror_puzzle_hash)
            .map(|record| (record.coin_id(), record))
            .collect();

        debug!(
            "Found {} candidate server coins for {launcher_id}",
            candidates.len()
        );

        let lookups = candidates
            .into_values()
            .map(|record| self.parent_with_record(record))
            .collect_vec();

        let parents: Vec<(CoinRecord, CoinSpend)> = stream::iter(lookups)
            .buffered(self.config.query_concurrency.max(1))
            .try_collect()
            .await?;

        let runner = &self.runner;

        let replayed = parents
            .into_par_iter()
            .map(|(record, parent)| {
                let mut allocator = Allocator::new();
                let server_coins = replay_server_coins(&mut allocator, runner, &parent);
                (record, parent.coin.puzzle_hash, server_coins)
            })
            .collect::<Vec<_>>();

        let mut servers = Vec::with_capacity(replayed.len());

        for (record, parent_puzzle_hash, server_coins) in replayed {
            let coin_id = record.coin_id();

            let server_coins = match server_coins {
                Ok(server_coins) => server_coins,
                Err(error) => {
                    warn!("Skipping coin {coin_id}, its parent could not be decoded: {error}");
                    continue;
                }
            };

            let Some(server_coin) = server_coins
                .into_iter()
                .find(|server_coin| server_coin.amount == record.amount())
            else {
                warn!("Skipping coin {coin_id}, its parent did not create a server coin");
                continue;
            };

            if server_coin.urls.is_empty() {
                warn!("Skipping coin {coin_id}, it has no urls");
                continue;
            }

            servers.push(ServerRecord {
                amount: record.amount(),
                coin_id,
                launcher_id,
                ours: self.wallet.owns_puzzle_hash(parent_puzzle_hash),
                urls: server_coin.urls,
            });
        }

        Ok(servers)
    }

    async fn resolve_fee(&self, fee: Option<u64>) -> Result<u64> {
        match fee {
            Some(fee) => Ok(fee),
            None => self.bounded("fee estimate", self.fees.estimate()).await,
        }
    }

    async fn parent_spend(&self, record: CoinRecord) -> Result<CoinSpend> {
        let parent_id = record.coin.parent_coin_info;

        self.bounded(
            "parent spend",
            self.ledger
                .puzzle_and_solution(parent_id, record.confirmed_height),
        )
        .await?
        .ok_or(Error::ParentDataUnavailable(parent_id))
    }

    async fn parent_with_record(&self, record: CoinRecord) -> Result<(CoinRecord, CoinSpend)> {
        Ok((record, self.parent_spend(record).await?))
    }

    async fn sign_and_submit(&self, bundle: SpendBundle) -> Result<TransactionId> {
        let bundle = self
            .bounded(
                "signing",
                self.wallet.sign(bundle, &self.config.constants),
            )
            .await?;

        let transaction_id = bundle.name();

        match self.bounded("submission", self.ledger.submit(bundle)).await? {
            SubmitOutcome::Accepted => {
                info!("Submitted transaction {transaction_id}");
                Ok(transaction_id)
            }
            SubmitOutcome::Rejected(reason) => Err(Error::SubmissionRejected(reason)),
        }
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        future: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        timeout(self.config.timeout, future).await.map_err(|_| {
            Error::CollaboratorUnavailable(format!(
                "{operation} timed out after {:?}",
                self.config.timeout
            ))
        })?
    }
}
