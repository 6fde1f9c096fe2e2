//! JSON-RPC client for the Dingo daemon.
//!
//! Wraps the wallet/chain RPC surface the authority node consumes: address
//! and multisig derivation, received/unspent queries, and the raw
//! transaction build/decode/sign/broadcast cycle. Also provides the
//! client-side raw-transaction shape check used during payout co-signing.

pub mod client;
pub mod error;
pub mod types;
pub mod verify;

pub use client::DingoClient;
pub use error::{ClientError, ClientResult};
pub use types::{
    CreateMultisigResult, DecodedTransaction, ListUnspentEntry, RpcBlockchainInfo,
    SignRawTransactionResult, ValidateAddressResult,
};
pub use verify::check_transaction_shape;
