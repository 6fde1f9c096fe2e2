//! Error types for the EVM client.

use thiserror::Error;

pub type EvmClientResult<T> = Result<T, EvmClientError>;

#[derive(Debug, Error)]
pub enum EvmClientError {
    #[error("invalid provider url: {0}")]
    InvalidProviderUrl(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("contract call failed: {0}")]
    Contract(String),

    #[error("signing failed: {0}")]
    Signer(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("no burn with index {1} for {0}")]
    UnknownBurn(String, u64),

    #[error("on-chain amount out of range: {0}")]
    AmountOutOfRange(String),
}
