//! wDingo bridge authority node.
//!
//! One of N federated operators custodying the Dingo side of the bridge:
//! co-derives multisig deposit addresses, authorizes mints against
//! confirmed deposits, takes withdrawal submissions, and co-signs the
//! periodic settlement transaction driven by the payout coordinator.

mod args;
mod config;
mod context;
mod coordinator;
mod errors;
mod handlers;
mod logging;
mod rpc_server;

use std::sync::Arc;

use anyhow::Context as _;
use tracing::*;
use wdingo_db::BridgeStore;
use wdingo_dingoio::DingoClient;
use wdingo_evmio::EvmClient;
use wdingo_rocksdb_store::{open_rocksdb_database, BridgeDb};

use crate::args::Args;
use crate::config::Config;
use crate::context::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Args = argh::from_env();
    let mut config = Config::load(&args.config)
        .with_context(|| format!("load config {}", args.config.display()))?;
    args.override_config(&mut config);

    let db = open_rocksdb_database(&config.node.datadir).context("open database")?;
    let store = Arc::new(BridgeDb::new(db));

    if let Some(path) = &args.restore_dump {
        let dump = std::fs::read_to_string(path)
            .with_context(|| format!("read dump {}", path.display()))?;
        store.reset(&dump).context("restore from dump")?;
        info!(path = %path.display(), "store restored from dump");
    }

    let dingo = DingoClient::new(
        config.dingo.rpc_url.clone(),
        config.dingo.rpc_user.clone(),
        config.dingo.rpc_password.clone(),
        config.dingo.retry_count,
    )
    .context("build dingo client")?;

    let wallet_key = std::fs::read_to_string(&config.evm.wallet_key_path)
        .with_context(|| format!("read wallet key {}", config.evm.wallet_key_path.display()))?;
    let evm = EvmClient::new(
        &config.evm.provider_url,
        config.evm.chain_id,
        &config.evm.contract_address,
        &wallet_key,
    )
    .context("build evm client")?;

    let ctx = Arc::new(AppContext::new(config, dingo, evm, store)?);
    info!(
        authority = ctx.own_index,
        coordinator = ctx.is_coordinator(),
        address = %ctx.evm.address(),
        "authority node starting"
    );

    let (handle, loopback_handle) = rpc_server::start(ctx.clone()).await?;

    let mut shutdown_rx = ctx.shutdown_rx();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received, shutting down"),
        _ = shutdown_rx.changed() => info!("shutdown requested over RPC"),
    }

    if handle.stop().is_err() {
        warn!("rpc server already stopped");
    }
    if loopback_handle.stop().is_err() {
        warn!("loopback listener already stopped");
    }
    handle.stopped().await;
    loopback_handle.stopped().await;

    Ok(())
}
