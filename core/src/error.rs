use thiserror::Error;

use obscura_account::AddressError;
use obscura_commitment::CommitmentError;

pub type MixerResult<T> = Result<T, MixerError>;

/// Every failure surfaced to callers of the core, one variant per kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MixerError {
    /// Bad user input, rejected before any side effect
    #[error("{0}")]
    Validation(String),

    #[error("wallet unavailable: {0}")]
    WalletUnavailable(String),

    /// Malformed address or hash
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// Submission failed, the transaction reverted or the receipt timed out
    #[error("on-chain error: {0}")]
    OnChain(String),

    #[error("quote error: {0}")]
    Quote(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    WalletUnavailable,
    Encoding,
    Configuration,
    OnChain,
    Quote,
    Persistence,
}

impl MixerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MixerError::Validation(_) => ErrorKind::Validation,
            MixerError::WalletUnavailable(_) => ErrorKind::WalletUnavailable,
            MixerError::Encoding(_) => ErrorKind::Encoding,
            MixerError::Configuration(_) => ErrorKind::Configuration,
            MixerError::OnChain(_) => ErrorKind::OnChain,
            MixerError::Quote(_) => ErrorKind::Quote,
            MixerError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        MixerError::Persistence(format!("{:#}", err))
    }
}

impl From<AddressError> for MixerError {
    fn from(err: AddressError) -> Self {
        MixerError::Encoding(err.to_string())
    }
}

impl From<CommitmentError> for MixerError {
    fn from(err: CommitmentError) -> Self {
        match err {
            CommitmentError::Entropy(msg) => {
                MixerError::Configuration(format!("no secure randomness: {}", msg))
            }
            other => MixerError::Encoding(other.to_string()),
        }
    }
}
