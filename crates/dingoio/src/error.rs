//! Error types for the Dingo RPC client.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// Network error, retry might help.
    #[error("network: {0}")]
    Network(String),

    /// RPC server returned an error.
    #[error("daemon returned error '{1}' (code {0})")]
    Server(i32, String),

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Connection error, retry might help.
    #[error("could not connect: {0}")]
    Connection(String),

    /// Timeout error, retry might help.
    #[error("timeout")]
    Timeout,

    /// Error building the request, unlikely to be recoverable.
    #[error("could not build request: {0}")]
    ReqBuilder(String),

    /// Maximum retries exceeded, not retryable.
    #[error("max retries {0} exceeded")]
    MaxRetriesExceeded(u8),

    /// The daemon wallet refused to (fully) sign the transaction.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A raw transaction does not match the expected inputs/outputs.
    #[error("transaction shape mismatch: {0}")]
    TxShapeMismatch(String),

    /// An amount could not be converted across the RPC boundary.
    #[error("bad amount: {0}")]
    BadAmount(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::MalformedResponse(value.to_string())
    }
}
