use thiserror::Error;

use obscura_account::AddressError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    /// Recipient is not a well-formed account address
    #[error("invalid recipient address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("expected {expected} hex characters, got {got}")]
    InvalidLength { expected: usize, got: usize },

    /// The operating system random source failed
    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}
