use chia::protocol::Bytes32;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Driver error: {0}")]
    Driver(#[from] server_coin_driver::Error),

    #[error("Coin {0} was not found")]
    CoinNotFound(Bytes32),

    #[error("Puzzle and solution for parent {0} are unavailable")]
    ParentDataUnavailable(Bytes32),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Transaction rejected: {0}")]
    SubmissionRejected(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Mnemonic error: {0}")]
    Mnemonic(#[from] bip39::Error),
}

impl Error {
    /// Whether the caller may retry with a fresh fee and coin selection.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::CollaboratorUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
