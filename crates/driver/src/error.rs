use chia::protocol::Bytes32;
use clvm_traits::{FromClvmError, ToClvmError};
use clvmr::reduction::EvalErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid launcher id: {0}")]
    InvalidIdentifier(String),

    #[error("Insufficient balance: need {needed} mojos, {available} available")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("Unknown puzzle for puzzle hash {0}")]
    UnknownPuzzle(Bytes32),

    #[error("Coin {0} is not locked by the mirror puzzle")]
    NotServerCoin(Bytes32),

    #[error("A server coin needs at least one url")]
    NoUrls,

    #[error("Selected coins total {total} but {spent} is spent")]
    ChangeUnderflow { total: u64, spent: u64 },

    #[error("Change of {change} plus {returned} returned mojos overflows")]
    ChangeOverflow { change: u64, returned: u64 },

    #[error("Malformed condition: {0}")]
    MalformedCondition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Eval error: {0}")]
    Eval(#[from] EvalErr),

    #[error("To CLVM error: {0}")]
    ToClvm(#[from] ToClvmError),

    #[error("From CLVM error: {0}")]
    FromClvm(#[from] FromClvmError),
}

pub type Result<T> = std::result::Result<T, Error>;
