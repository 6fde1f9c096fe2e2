//! Node configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wdingo_primitives::{FeeSchedule, Sats};

const DEFAULT_RPC_PORT: u16 = 8443;
const DEFAULT_LOOPBACK_PORT: u16 = 8444;
const DEFAULT_DATADIR: &str = "wdingo-data";
const DEFAULT_ERROR_LOG: &str = "wdingo-error.log";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    pub listen_host: String,

    #[serde(default = "default_rpc_port")]
    pub listen_port: u16,

    /// Port of the 127.0.0.1-only listener carrying `executePayouts`.
    #[serde(default = "default_loopback_port")]
    pub loopback_port: u16,

    #[serde(default = "default_datadir")]
    pub datadir: PathBuf,

    #[serde(default = "default_error_log")]
    pub error_log_path: PathBuf,
}

fn default_rpc_port() -> u16 {
    DEFAULT_RPC_PORT
}

fn default_loopback_port() -> u16 {
    DEFAULT_LOOPBACK_PORT
}

fn default_datadir() -> PathBuf {
    DEFAULT_DATADIR.into()
}

fn default_error_log() -> PathBuf {
    DEFAULT_ERROR_LOG.into()
}

/// One entry of the fixed, ordered authority set. The order is part of the
/// protocol: phase-1 envelopes are matched positionally and multisig
/// pubkeys are passed to the daemon in this order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityNode {
    pub hostname: String,
    pub port: u16,
    /// The authority's token-chain wallet address; envelope signatures are
    /// checked against it.
    pub wallet_address: String,
}

impl AuthorityNode {
    /// Base URL for peer calls. `hostname` may carry an explicit scheme;
    /// otherwise HTTPS is assumed.
    pub fn url(&self) -> String {
        if self.hostname.contains("://") {
            format!("{}:{}", self.hostname, self.port)
        } else {
            format!("https://{}:{}", self.hostname, self.port)
        }
    }
}

/// Fee constants, overridable per deployment. All values in satoshis.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeeSettings {
    pub flat_fee: Option<u64>,
    pub payout_network_fee_per_tx: Option<u64>,
    pub dust_threshold: Option<u64>,
}

/// The settings shared (and cross-checked) by all authorities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettings {
    pub authority_nodes: Vec<AuthorityNode>,
    /// k of the k-of-N multisig.
    pub authority_threshold: u32,
    /// Index into `authority_nodes` of the node driving settlement.
    pub payout_coordinator: usize,
    pub deposit_confirmations: u64,
    pub change_confirmations: u64,
    /// Envelope anchors may lag the tip by up to this many blocks; they
    /// expire at twice this.
    pub sync_delay_threshold: u64,
    pub change_address: String,
    pub tax_payout_addresses: Vec<String>,

    #[serde(default)]
    pub fees: FeeSettings,
}

impl PublicSettings {
    pub fn fee_schedule(&self) -> FeeSchedule {
        let defaults = FeeSchedule::default();
        FeeSchedule {
            flat_fee: self
                .fees
                .flat_fee
                .map_or(defaults.flat_fee, Sats::from_sat),
            payout_network_fee_per_tx: self
                .fees
                .payout_network_fee_per_tx
                .map_or(defaults.payout_network_fee_per_tx, Sats::from_sat),
            dust_threshold: self
                .fees
                .dust_threshold
                .map_or(defaults.dust_threshold, Sats::from_sat),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DingoConfig {
    pub rpc_url: String,
    pub rpc_user: String,
    pub rpc_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EvmConfig {
    pub provider_url: String,
    pub chain_id: u64,
    pub contract_address: String,
    /// File holding the authority's hex secp256k1 key; keep permissions
    /// strict.
    pub wallet_key_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub node: NodeConfig,
    pub public: PublicSettings,
    pub dingo: DingoConfig,
    pub evm: EvmConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        if config.public.authority_nodes.is_empty() {
            anyhow::bail!("authorityNodes must not be empty");
        }
        if config.public.payout_coordinator >= config.public.authority_nodes.len() {
            anyhow::bail!("payoutCoordinator is out of range");
        }
        let n = config.public.authority_nodes.len() as u32;
        if config.public.authority_threshold == 0 || config.public.authority_threshold > n {
            anyhow::bail!("authorityThreshold must be in 1..=N");
        }
        Ok(config)
    }
}
