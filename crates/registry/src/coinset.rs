use std::{fmt::Display, sync::Arc};

use chia::protocol::{Bytes32, CoinSpend, SpendBundle};
use chia_wallet_sdk::coinset::{ChiaRpcClient, CoinsetClient, FullNodeClient};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use server_coin_types::CoinRecord;
use tracing::{debug, warn};

use crate::{Error, FeeEstimator, Ledger, Result, SubmitOutcome};

/// Either the local full node, authenticated with its private TLS identity,
/// or a remote node speaking the same RPC over plain HTTPS.
#[derive(Debug)]
pub enum NodeClient {
    Local(FullNodeClient),
    Remote(CoinsetClient),
}

impl ChiaRpcClient for NodeClient {
    type Error = <FullNodeClient as ChiaRpcClient>::Error;

    fn base_url(&self) -> &str {
        match self {
            Self::Local(client) => client.base_url(),
            Self::Remote(client) => client.base_url(),
        }
    }

    async fn make_post_request<R, B>(
        &self,
        endpoint: &str,
        body: B,
    ) -> std::result::Result<R, Self::Error>
    where
        B: Serialize + Send,
        R: DeserializeOwned + Send,
    {
        match self {
            Self::Local(client) => client.make_post_request(endpoint, body).await,
            Self::Remote(client) => client.make_post_request(endpoint, body).await,
        }
    }
}

/// [`Ledger`] backed by a full node's RPC interface.
pub struct CoinsetLedger {
    client: Arc<NodeClient>,
}

impl CoinsetLedger {
    pub fn new(client: Arc<NodeClient>) -> Self {
        Self { client }
    }
}

fn unavailable(error: impl Display) -> Error {
    Error::CollaboratorUnavailable(error.to_string())
}

fn failed(endpoint: &str, error: Option<String>) -> Error {
    Error::CollaboratorUnavailable(error.unwrap_or_else(|| format!("{endpoint} failed")))
}

impl Ledger for CoinsetLedger {
    async fn coin_records_by_hint(&self, hint: Bytes32) -> Result<Vec<CoinRecord>> {
        let response = self
            .client
            .get_coin_records_by_hint(hint, None, None, Some(false))
            .await
            .map_err(unavailable)?;

        if !response.success {
            return Err(failed("get_coin_records_by_hint", response.error));
        }

        Ok(response
            .coin_records
            .unwrap_or_default()
            .into_iter()
            .map(|record| CoinRecord::new(record.coin, record.confirmed_block_index))
            .collect())
    }

    async fn coin_record(&self, coin_id: Bytes32) -> Result<Option<CoinRecord>> {
        let response = self
            .client
            .get_coin_record_by_name(coin_id)
            .await
            .map_err(unavailable)?;

        // The node reports a missing coin as an unsuccessful response.
        if let Some(error) = response.error.as_ref().filter(|_| !response.success) {
            debug!("Coin record lookup for {coin_id} failed: {error}");
        }

        Ok(response
            .coin_record
            .map(|record| CoinRecord::new(record.coin, record.confirmed_block_index)))
    }

    async fn puzzle_and_solution(&self, coin_id: Bytes32, height: u32) -> Result<Option<CoinSpend>> {
        let response = self
            .client
            .get_puzzle_and_solution(coin_id, Some(height))
            .await
            .map_err(unavailable)?;

        Ok(response.coin_solution)
    }

    async fn unspent_coins(&self, puzzle_hashes: Vec<Bytes32>) -> Result<Vec<CoinRecord>> {
        let response = self
            .client
            .get_coin_records_by_puzzle_hashes(puzzle_hashes, None, None, Some(false))
            .await
            .map_err(unavailable)?;

        if !response.success {
            return Err(failed("get_coin_records_by_puzzle_hashes", response.error));
        }

        Ok(response
            .coin_records
            .unwrap_or_default()
            .into_iter()
            .filter(|record| !record.spent)
            .map(|record| CoinRecord::new(record.coin, record.confirmed_block_index))
            .collect())
    }

    async fn submit(&self, bundle: SpendBundle) -> Result<SubmitOutcome> {
        let response = self.client.push_tx(bundle).await.map_err(unavailable)?;

        if response.success {
            Ok(SubmitOutcome::Accepted)
        } else {
            Ok(SubmitOutcome::Rejected(
                response.error.unwrap_or(response.status),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FeeEstimateResponse {
    #[serde(default)]
    pub estimates: Vec<f64>,
    pub success: bool,
    pub error: Option<String>,
}

impl FeeEstimateResponse {
    /// The fee for the first requested target time, rounded up to a whole mojo.
    pub fn fee(&self) -> Option<u64> {
        if !self.success {
            return None;
        }

        self.estimates
            .first()
            .filter(|estimate| estimate.is_finite() && **estimate >= 0.0)
            .map(|estimate| estimate.ceil() as u64)
    }
}

/// Asks the node's mempool for a fee that confirms within `target_secs`,
/// falling back to a fixed fee when the node has no answer.
#[derive(Debug, Clone)]
pub struct NodeFee {
    client: Arc<NodeClient>,
    target_secs: u64,
    cost: u64,
    fallback: u64,
}

impl NodeFee {
    /// Roughly the cost of a two coin standard spend bundle.
    pub const DEFAULT_COST: u64 = 20_000_000;

    pub fn new(client: Arc<NodeClient>, fallback: u64) -> Self {
        Self {
            client,
            target_secs: 60,
            cost: Self::DEFAULT_COST,
            fallback,
        }
    }

    pub fn with_target_secs(mut self, target_secs: u64) -> Self {
        self.target_secs = target_secs;
        self
    }

    pub fn with_cost(mut self, cost: u64) -> Self {
        self.cost = cost;
        self
    }
}

impl FeeEstimator for NodeFee {
    async fn estimate(&self) -> Result<u64> {
        let response: std::result::Result<FeeEstimateResponse, _> = self
            .client
            .make_post_request(
                "get_fee_estimate",
                json!({
                    "cost": self.cost,
                    "target_times": [self.target_secs],
                }),
            )
            .await;

        match response {
            Ok(response) => match response.fee() {
                Some(fee) => {
                    debug!("Node estimated a fee of {fee} for {} seconds", self.target_secs);
                    Ok(fee)
                }
                None => {
                    warn!(
                        "Node returned no fee estimate ({}), using {}",
                        response.error.as_deref().unwrap_or("no estimates"),
                        self.fallback
                    );
                    Ok(self.fallback)
                }
            },
            Err(error) => {
                warn!("Fee estimate failed ({error}), using {}", self.fallback);
                Ok(self.fallback)
            }
        }
    }
}
