//! The application context threaded through every handler.

use std::sync::Arc;
use std::time::Instant;

use alloy::primitives::Address;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use wdingo_db::BridgeStore;
use wdingo_dingoio::DingoClient;
use wdingo_envelope::{ChainAnchor, Envelope};
use wdingo_evmio::EvmClient;
use wdingo_primitives::FeeSchedule;

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::logging::ErrorLog;

pub struct AppContext {
    pub config: Config,
    pub fees: FeeSchedule,
    pub dingo: DingoClient,
    pub evm: EvmClient,
    pub store: Arc<dyn BridgeStore>,

    /// Serializes every store mutation and the whole co-signing critical
    /// section. Held across awaits.
    pub write_lock: Mutex<()>,

    /// Cached stats payload and when it was computed.
    pub stats_cache: Mutex<Option<(Instant, serde_json::Value)>>,

    pub error_log: ErrorLog,

    /// Authority wallet addresses, in configured order.
    pub authority_addresses: Vec<Address>,

    /// This node's position in `authority_addresses`.
    pub own_index: usize,

    shutdown_tx: watch::Sender<bool>,
}

impl AppContext {
    pub fn new(
        config: Config,
        dingo: DingoClient,
        evm: EvmClient,
        store: Arc<dyn BridgeStore>,
    ) -> anyhow::Result<Self> {
        let authority_addresses = config
            .public
            .authority_nodes
            .iter()
            .map(|node| {
                node.wallet_address.parse::<Address>().map_err(|_| {
                    anyhow::anyhow!("invalid authority wallet address {}", node.wallet_address)
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let own_index = authority_addresses
            .iter()
            .position(|addr| *addr == evm.address())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "this node's wallet address {} is not in authorityNodes",
                    evm.address()
                )
            })?;

        let fees = config.public.fee_schedule();
        let error_log = ErrorLog::new(config.node.error_log_path.clone());
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            fees,
            dingo,
            evm,
            store,
            write_lock: Mutex::new(()),
            stats_cache: Mutex::new(None),
            error_log,
            authority_addresses,
            own_index,
            shutdown_tx,
        })
    }

    pub fn coordinator_address(&self) -> Address {
        self.authority_addresses[self.config.public.payout_coordinator]
    }

    pub fn is_coordinator(&self) -> bool {
        self.own_index == self.config.public.payout_coordinator
    }

    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// The anchor for outgoing envelopes: `sync_delay_threshold` blocks
    /// behind the tip, so mildly desynced peers can still verify it.
    pub async fn current_anchor(&self) -> AppResult<ChainAnchor> {
        let info = self.dingo.get_blockchain_info().await?;
        let height = info
            .blocks
            .saturating_sub(self.config.public.sync_delay_threshold);
        let hash = self.dingo.get_block_hash(height).await?;
        Ok(ChainAnchor { height, hash })
    }

    /// Seals a reply payload with a fresh anchor and this node's key.
    pub async fn seal<T: Serialize>(&self, payload: &T) -> AppResult<Envelope> {
        let anchor = self.current_anchor().await?;
        Ok(Envelope::seal(payload, &anchor, self.evm.signer()).await?)
    }

    /// Verifies an incoming envelope's anchor against the local chain view.
    pub async fn check_anchor(&self, envelope: &Envelope) -> AppResult<()> {
        let anchor = envelope.anchor()?;
        let info = self.dingo.get_blockchain_info().await?;
        if anchor.height > info.blocks {
            return Err(AppError::Unauthorized(format!(
                "anchor height {} is ahead of the local tip {}",
                anchor.height, info.blocks
            )));
        }
        let local_hash = self.dingo.get_block_hash(anchor.height).await?;
        anchor.check(
            info.blocks,
            &local_hash,
            self.config.public.sync_delay_threshold,
        )?;
        Ok(())
    }

    /// Authenticates an authority-only request: signed by exactly one
    /// configured authority and anchored to a live chain view. Returns the
    /// signer.
    pub async fn authenticate_authority(&self, envelope: &Envelope) -> AppResult<Address> {
        let signer = envelope.verify_any_signer(&self.authority_addresses)?;
        self.check_anchor(envelope).await?;
        Ok(signer)
    }

    /// Authenticates a coordinator-only request.
    pub async fn authenticate_coordinator(&self, envelope: &Envelope) -> AppResult<()> {
        envelope.verify_signer(self.coordinator_address())?;
        self.check_anchor(envelope).await?;
        Ok(())
    }
}

/// Parses a token-chain address and returns it alongside its canonical
/// (checksummed) string form, which is what gets persisted and exchanged.
pub fn parse_evm_address(s: &str) -> AppResult<(Address, String)> {
    let address = s
        .parse::<Address>()
        .map_err(|_| AppError::MalformedRequest(format!("invalid mint/burn address {s}")))?;
    Ok((address, address.to_string()))
}
