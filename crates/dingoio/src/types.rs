//! Typed results for the daemon RPC methods the node consumes.
//!
//! Amounts arrive from the daemon as JSON numbers in coin units; they are
//! converted to [`Sats`] at this boundary and never handled as floats past
//! it.

use serde::{Deserialize, Serialize};
use wdingo_primitives::{AmountError, Sats};

use crate::error::ClientError;

/// Result of `getblockchaininfo`, reduced to the fields the node uses.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RpcBlockchainInfo {
    /// The current number of blocks processed in the server.
    pub blocks: u64,
    /// The hash of the currently best block.
    #[serde(rename = "bestblockhash")]
    pub best_block_hash: String,
}

/// Result of `validateaddress`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ValidateAddressResult {
    #[serde(rename = "isvalid")]
    pub is_valid: bool,
    pub address: Option<String>,
    /// Raw public key, present only for addresses owned by the wallet.
    pub pubkey: Option<String>,
}

/// Result of `createmultisig`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CreateMultisigResult {
    pub address: String,
    #[serde(rename = "redeemScript")]
    pub redeem_script: String,
}

/// One entry of `listreceivedbyaddress`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ListReceivedEntry {
    pub address: String,
    pub amount: f64,
    pub confirmations: u64,
}

/// One entry of `listunspent`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ListUnspentEntry {
    pub txid: String,
    pub vout: u32,
    pub address: String,
    pub amount: f64,
    pub confirmations: u64,
}

/// Result of `signrawtransaction`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SignRawTransactionResult {
    pub hex: String,
    pub complete: bool,
}

/// A decoded raw transaction, reduced to the fields the shape check needs.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DecodedTransaction {
    pub txid: String,
    pub vin: Vec<DecodedVin>,
    pub vout: Vec<DecodedVout>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DecodedVin {
    pub txid: String,
    pub vout: u32,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DecodedVout {
    pub value: f64,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: DecodedScriptPubKey,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DecodedScriptPubKey {
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Converts a daemon coin amount to satoshis, surfacing conversion failures
/// as client errors.
pub fn sats_from_coin(value: f64) -> Result<Sats, ClientError> {
    Sats::from_coin_f64(value).map_err(|e: AmountError| ClientError::BadAmount(e.to_string()))
}
