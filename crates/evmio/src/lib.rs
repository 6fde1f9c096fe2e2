//! Client for the token-chain side of the bridge.
//!
//! Owns the authority's secp256k1 key, reads mint/burn state from the
//! wrapped-token contract, and produces the signatures the contract's mint
//! verifier accepts. Burn events are immutable on-chain facts and are
//! memoized for the lifetime of the process.

pub mod client;
pub mod contract;
pub mod error;

pub use client::{EvmClient, MintHistory, OnContractVerification};
pub use error::{EvmClientError, EvmClientResult};
