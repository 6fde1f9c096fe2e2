use alloy::primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("payload must be a JSON object")]
    NotAnObject,

    #[error("envelope carries no chain anchor")]
    MissingAnchor,

    #[error("bad signature: {0}")]
    BadSignature(String),

    #[error("signed by {0}, not the expected sender")]
    WrongSigner(Address),

    #[error("signer {0} is not an authority")]
    UnknownSigner(Address),

    #[error("anchor height {height} expired (current tip {current})")]
    Expired { height: u64, current: u64 },

    #[error("anchor height {height} is ahead of the local tip {current}")]
    AheadOfTip { height: u64, current: u64 },

    #[error("anchor hash does not match the local chain at height {height}")]
    HashMismatch { height: u64 },

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("payload: {0}")]
    Payload(String),
}
