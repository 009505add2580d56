use chia::protocol::{Bytes32, Coin};

/// An unspent coin as reported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinRecord {
    pub coin: Coin,
    pub confirmed_height: u32,
}

impl CoinRecord {
    pub fn new(coin: Coin, confirmed_height: u32) -> Self {
        Self {
            coin,
            confirmed_height,
        }
    }

    pub fn coin_id(&self) -> Bytes32 {
        self.coin.coin_id()
    }

    pub fn amount(&self) -> u64 {
        self.coin.amount
    }
}
