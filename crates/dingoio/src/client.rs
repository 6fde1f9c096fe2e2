//! The JSON-RPC 1.0 client for the Dingo daemon.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, to_value, Value};
use tracing::*;
use wdingo_primitives::{Sats, UnspentOutput};

use crate::error::{ClientError, ClientResult};
use crate::types::*;
use crate::verify::check_transaction_shape;

const DEFAULT_MAX_RETRIES: u8 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Upper bound passed for `maxconf` where the RPC requires one.
const MAX_CONFIRMATIONS: u64 = 9_999_999;

/// A JSON-RPC error returned by the daemon.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct RpcError {
    code: i32,
    message: String,
}

impl Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "RPC error code {}: {}", self.code, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
struct Response<R> {
    result: Option<R>,
    error: Option<RpcError>,
    id: u64,
}

/// Connection to the Dingo daemon RPC endpoint.
#[derive(Debug)]
pub struct DingoClient {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
    max_retries: u8,
}

impl DingoClient {
    pub fn new(
        url: String,
        username: String,
        password: String,
        max_retries: Option<u8>,
    ) -> ClientResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
                .parse()
                .map_err(|_| ClientError::ReqBuilder("invalid auth header".into()))?,
        );
        headers.insert(
            "Content-Type",
            "application/json"
                .parse()
                .map_err(|_| ClientError::ReqBuilder("invalid content type".into()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::ReqBuilder(e.to_string()))?;

        Ok(Self {
            url,
            client,
            next_id: AtomicU64::new(0),
            max_retries: max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::AcqRel)
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: &[Value],
    ) -> ClientResult<T> {
        let mut retries = 0;
        loop {
            let id = self.next_id();
            let response = self
                .client
                .post(&self.url)
                .json(&json!({
                    "jsonrpc": "1.0",
                    "id": id,
                    "method": method,
                    "params": params,
                }))
                .send()
                .await;

            let err = match response {
                Ok(resp) => {
                    let data = resp
                        .json::<Response<T>>()
                        .await
                        .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;
                    if let Some(err) = data.error {
                        return Err(ClientError::Server(err.code, err.message));
                    }
                    return match data.result {
                        Some(result) => Ok(result),
                        // Methods like importaddress return a JSON null.
                        None => serde_json::from_value(Value::Null).map_err(|_| {
                            ClientError::MalformedResponse("empty result".into())
                        }),
                    };
                }
                Err(err) => err,
            };

            warn!(%method, %err, "error calling dingo daemon");
            let retryable = err.is_connect() || err.is_timeout() || err.is_request();
            if !retryable {
                return Err(ClientError::Network(err.to_string()));
            }

            retries += 1;
            if retries > self.max_retries {
                return Err(ClientError::MaxRetriesExceeded(self.max_retries));
            }
            tokio::time::sleep(RETRY_BACKOFF).await;
        }
    }

    fn param<T: Serialize>(value: T) -> ClientResult<Value> {
        to_value(value).map_err(|e| ClientError::ReqBuilder(e.to_string()))
    }

    /// Corresponds to `getblockchaininfo`.
    pub async fn get_blockchain_info(&self) -> ClientResult<RpcBlockchainInfo> {
        self.call("getblockchaininfo", &[]).await
    }

    /// Block hash at the given height.
    pub async fn get_block_hash(&self, height: u64) -> ClientResult<String> {
        self.call("getblockhash", &[Self::param(height)?]).await
    }

    /// A fresh wallet address.
    pub async fn get_new_address(&self) -> ClientResult<String> {
        self.call("getnewaddress", &[]).await
    }

    pub async fn validate_address(&self, address: &str) -> ClientResult<ValidateAddressResult> {
        self.call("validateaddress", &[Self::param(address)?]).await
    }

    /// A fresh wallet address's raw public key, for multisig derivation.
    pub async fn get_new_pubkey(&self) -> ClientResult<String> {
        let address = self.get_new_address().await?;
        let info = self.validate_address(&address).await?;
        info.pubkey.ok_or_else(|| {
            ClientError::MalformedResponse(format!("no pubkey for wallet address {address}"))
        })
    }

    /// Derives a k-of-n multisig address. Deterministic in the pubkey order;
    /// the caller supplies pubkeys in the fixed authority-node order and
    /// this client never reorders them.
    pub async fn create_multisig(
        &self,
        threshold: u32,
        pubkeys: &[String],
    ) -> ClientResult<CreateMultisigResult> {
        self.call(
            "createmultisig",
            &[Self::param(threshold)?, Self::param(pubkeys)?],
        )
        .await
    }

    /// Imports a redeem script as watch-only so the daemon indexes the
    /// multisig address and can later co-sign spends. No rescan.
    pub async fn import_address(&self, redeem_script: &str) -> ClientResult<()> {
        let _: Value = self
            .call(
                "importaddress",
                &[
                    Self::param(redeem_script)?,
                    Self::param("")?,
                    Self::param(false)?,
                    Self::param(true)?,
                ],
            )
            .await?;
        Ok(())
    }

    /// Confirmed received amount per address, including watch-only.
    pub async fn list_received_by_address(
        &self,
        min_confirmations: u64,
    ) -> ClientResult<BTreeMap<String, Sats>> {
        let entries: Vec<ListReceivedEntry> = self
            .call(
                "listreceivedbyaddress",
                &[
                    Self::param(min_confirmations)?,
                    Self::param(false)?,
                    Self::param(true)?,
                ],
            )
            .await?;

        let mut received = BTreeMap::new();
        for entry in entries {
            received.insert(entry.address, sats_from_coin(entry.amount)?);
        }
        Ok(received)
    }

    /// Confirmed UTXOs at the given addresses.
    pub async fn list_unspent(
        &self,
        min_confirmations: u64,
        addresses: &[String],
    ) -> ClientResult<Vec<UnspentOutput>> {
        let entries: Vec<ListUnspentEntry> = self
            .call(
                "listunspent",
                &[
                    Self::param(min_confirmations)?,
                    Self::param(MAX_CONFIRMATIONS)?,
                    Self::param(addresses)?,
                ],
            )
            .await?;

        entries
            .into_iter()
            .map(|e| {
                Ok(UnspentOutput {
                    txid: e.txid,
                    vout: e.vout,
                    address: e.address,
                    amount: sats_from_coin(e.amount)?,
                })
            })
            .collect()
    }

    /// Builds an unsigned raw transaction spending exactly `unspent` into
    /// `vouts`. Amounts are rendered in coin units the way the daemon
    /// expects them.
    pub async fn create_raw_transaction(
        &self,
        unspent: &[UnspentOutput],
        vouts: &BTreeMap<String, Sats>,
    ) -> ClientResult<String> {
        let inputs: Vec<Value> = unspent
            .iter()
            .map(|u| json!({ "txid": u.txid, "vout": u.vout }))
            .collect();

        let mut outputs = serde_json::Map::new();
        for (address, amount) in vouts {
            let n = serde_json::Number::from_f64(amount.to_coin_f64())
                .ok_or_else(|| ClientError::BadAmount(amount.to_string()))?;
            outputs.insert(address.clone(), Value::Number(n));
        }

        self.call(
            "createrawtransaction",
            &[Self::param(inputs)?, Value::Object(outputs)],
        )
        .await
    }

    pub async fn decode_raw_transaction(&self, hex: &str) -> ClientResult<DecodedTransaction> {
        self.call("decoderawtransaction", &[Self::param(hex)?])
            .await
    }

    /// Adds this wallet's signatures to a (possibly partially signed) raw
    /// transaction. `complete` is false until the multisig threshold is met.
    pub async fn sign_raw_transaction(&self, hex: &str) -> ClientResult<SignRawTransactionResult> {
        self.call("signrawtransaction", &[Self::param(hex)?]).await
    }

    pub async fn send_raw_transaction(&self, hex: &str) -> ClientResult<String> {
        self.call("sendrawtransaction", &[Self::param(hex)?]).await
    }

    /// Decodes `hex` and checks it spends exactly `unspent` into exactly
    /// `vouts`. Any deviation fails with
    /// [`TxShapeMismatch`](ClientError::TxShapeMismatch).
    pub async fn verify_raw_transaction(
        &self,
        unspent: &[UnspentOutput],
        vouts: &BTreeMap<String, Sats>,
        hex: &str,
    ) -> ClientResult<()> {
        let decoded = self.decode_raw_transaction(hex).await?;
        check_transaction_shape(&decoded, unspent, vouts)
    }
}
