use rockbound::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("deposit pubkey {0} already used")]
    DepositPubkeyUsed(String),

    #[error("mint address {0} already bound")]
    MintAddressBound(String),

    #[error("deposit address {0} already bound")]
    DepositAddressBound(String),

    #[error("no mint binding for {0}")]
    UnknownMintBinding(String),

    #[error("withdrawal ({0}, {1}) already submitted")]
    WithdrawalExists(String, u64),

    #[error("no withdrawal ({0}, {1})")]
    UnknownWithdrawal(String, u64),

    #[error("unusable database dump: {0}")]
    BadDump(String),

    #[error("rocksdb: {0}")]
    Rocksdb(#[from] rockbound::rocksdb::Error),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for DbError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}

impl From<CodecError> for DbError {
    fn from(value: CodecError) -> Self {
        Self::Other(value.to_string())
    }
}
