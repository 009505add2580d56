use std::future::Future;

use bip39::Mnemonic;
use chia::{
    bls::{sign, DerivableKey, PublicKey, SecretKey, Signature},
    protocol::{Bytes32, SpendBundle},
    puzzles::DeriveSynthetic,
};
use chia_wallet_sdk::signer::{AggSigConstants, RequiredSignature};
use clvmr::Allocator;
use indexmap::IndexMap;
use server_coin_driver::PuzzleCache;
use server_coin_types::CoinRecord;
use tracing::debug;

use crate::{Error, Ledger, Result};

/// Key custody for the registry.
pub trait Wallet: Send + Sync {
    /// Coins the wallet is willing to spend. The set should cover
    /// `min_amount` whenever the balance allows it.
    fn spendable_coins(
        &self,
        min_amount: u64,
    ) -> impl Future<Output = Result<Vec<CoinRecord>>> + Send;

    /// Fills in the aggregated signature of `bundle`.
    fn sign(
        &self,
        bundle: SpendBundle,
        constants: &AggSigConstants,
    ) -> impl Future<Output = Result<SpendBundle>> + Send;

    fn owns_puzzle_hash(&self, puzzle_hash: Bytes32) -> bool;

    fn puzzle_cache(&self) -> &PuzzleCache;

    fn change_puzzle_hash(&self) -> Bytes32;
}

/// A wallet over the first few unhardened standard keys of a master key.
/// Coins are looked up through the ledger on every call.
#[derive(Debug)]
pub struct KeyWallet<L> {
    ledger: L,
    secret_keys: IndexMap<PublicKey, SecretKey>,
    puzzle_cache: PuzzleCache,
    change_puzzle_hash: Bytes32,
}

impl<L> KeyWallet<L> {
    pub fn from_mnemonic(ledger: L, phrase: &str, derivation_count: u32) -> Result<Self> {
        let mnemonic = Mnemonic::parse(phrase)?;
        let seed = mnemonic.to_seed("");
        Self::new(ledger, &SecretKey::from_seed(&seed), derivation_count)
    }

    pub fn new(ledger: L, master_key: &SecretKey, derivation_count: u32) -> Result<Self> {
        let intermediate = master_key
            .derive_unhardened(12381)
            .derive_unhardened(8444)
            .derive_unhardened(2);

        let mut allocator = Allocator::new();
        let mut secret_keys = IndexMap::new();
        let mut puzzle_cache = PuzzleCache::new();
        let mut change_puzzle_hash = None;

        for index in 0..derivation_count.max(1) {
            let secret_key = intermediate.derive_unhardened(index).derive_synthetic();
            let public_key = secret_key.public_key();

            let puzzle_hash = puzzle_cache.insert_standard(&mut allocator, public_key)?;
            change_puzzle_hash.get_or_insert(puzzle_hash);

            secret_keys.insert(public_key, secret_key);
        }

        debug!("Derived {} standard puzzle hashes", puzzle_cache.len());

        Ok(Self {
            ledger,
            secret_keys,
            puzzle_cache,
            change_puzzle_hash: change_puzzle_hash.unwrap_or_default(),
        })
    }
}

impl<L: Ledger> Wallet for KeyWallet<L> {
    async fn spendable_coins(&self, min_amount: u64) -> Result<Vec<CoinRecord>> {
        let puzzle_hashes = self.puzzle_cache.puzzle_hashes().collect();
        let coins = self.ledger.unspent_coins(puzzle_hashes).await?;

        debug!(
            "Found {} spendable coins worth {} mojos, {} needed",
            coins.len(),
            coins.iter().map(CoinRecord::amount).sum::<u64>(),
            min_amount
        );

        Ok(coins)
    }

    async fn sign(&self, mut bundle: SpendBundle, constants: &AggSigConstants) -> Result<SpendBundle> {
        let mut allocator = Allocator::new();

        let required =
            RequiredSignature::from_coin_spends(&mut allocator, &bundle.coin_spends, constants)
                .map_err(|error| Error::Signing(error.to_string()))?;

        let mut signatures = Vec::with_capacity(required.len());

        for required in required {
            let RequiredSignature::Bls(required) = required else {
                return Err(Error::Signing("secp signatures are not supported".to_string()));
            };

            let Some(secret_key) = self.secret_keys.get(&required.public_key) else {
                return Err(Error::Signing(format!(
                    "no secret key for public key 0x{}",
                    hex::encode(required.public_key.to_bytes())
                )));
            };

            signatures.push(sign(secret_key, required.message()));
        }

        bundle.aggregated_signature = signatures
            .into_iter()
            .fold(Signature::default(), |aggregate, signature| aggregate + &signature);

        Ok(bundle)
    }

    fn owns_puzzle_hash(&self, puzzle_hash: Bytes32) -> bool {
        self.puzzle_cache.contains(&puzzle_hash)
    }

    fn puzzle_cache(&self) -> &PuzzleCache {
        &self.puzzle_cache
    }

    fn change_puzzle_hash(&self) -> Bytes32 {
        self.change_puzzle_hash
    }
}

#[cfg(test)]
mod tests {
    use chia::puzzles::standard::StandardArgs;

    use super::*;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn derives_requested_keys() {
        let wallet = KeyWallet::from_mnemonic((), MNEMONIC, 5).unwrap();

        assert_eq!(wallet.puzzle_cache.len(), 5);
        assert_eq!(wallet.secret_keys.len(), 5);
        assert_eq!(
            wallet.change_puzzle_hash,
            wallet.puzzle_cache.puzzle_hashes().next().unwrap()
        );

        for public_key in wallet.secret_keys.keys() {
            let puzzle_hash: Bytes32 = StandardArgs::curry_tree_hash(*public_key).into();
            assert!(wallet.puzzle_cache.contains(&puzzle_hash));
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let first = KeyWallet::from_mnemonic((), MNEMONIC, 2).unwrap();
        let second = KeyWallet::from_mnemonic((), MNEMONIC, 2).unwrap();

        assert_eq!(first.change_puzzle_hash, second.change_puzzle_hash);
    }

    #[test]
    fn always_derives_at_least_one_key() {
        let wallet = KeyWallet::from_mnemonic((), MNEMONIC, 0).unwrap();
        assert_eq!(wallet.puzzle_cache.len(), 1);
    }

    #[test]
    fn rejects_invalid_mnemonic() {
        assert!(matches!(
            KeyWallet::from_mnemonic((), "not a real phrase", 1),
            Err(Error::Mnemonic(_))
        ));
    }
}
