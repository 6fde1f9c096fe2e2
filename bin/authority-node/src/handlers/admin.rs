//! Liveness plus the authority-only operator endpoints.

use tracing::*;
use wdingo_envelope::Envelope;
use wdingo_rpc_api::{DumpDatabaseResponse, Empty, LogResponse, PingResponse};

use crate::context::AppContext;
use crate::errors::AppResult;

pub async fn ping(ctx: &AppContext) -> AppResult<Envelope> {
    ctx.seal(&PingResponse {
        timestamp: chrono::Utc::now().timestamp_millis() as u64,
    })
    .await
}

pub async fn log(ctx: &AppContext, envelope: Envelope) -> AppResult<Envelope> {
    ctx.authenticate_authority(&envelope).await?;
    ctx.seal(&LogResponse {
        log: ctx.error_log.read(),
    })
    .await
}

/// Full store snapshot for divergence repair. Taken under the write lock
/// so the dump is a consistent cut.
pub async fn dump_database(ctx: &AppContext, envelope: Envelope) -> AppResult<Envelope> {
    ctx.authenticate_authority(&envelope).await?;

    let dump = {
        let _guard = ctx.write_lock.lock().await;
        ctx.store.dump()?
    };

    ctx.seal(&DumpDatabaseResponse { sql: dump }).await
}

/// Authority-authenticated self-termination, used for coordinated
/// restarts and upgrades.
pub async fn dingo_does_a_harakiri(ctx: &AppContext, envelope: Envelope) -> AppResult<Envelope> {
    let signer = ctx.authenticate_authority(&envelope).await?;
    warn!(%signer, "harakiri requested, shutting down");

    let reply = ctx.seal(&Empty {}).await?;
    ctx.request_shutdown();
    Ok(reply)
}
