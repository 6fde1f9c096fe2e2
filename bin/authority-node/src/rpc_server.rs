//! Bootstraps the node's two RPC listeners.
//!
//! The public listener carries the user, authority and coordinator
//! surfaces (the latter two authenticate themselves via envelopes). The
//! loopback listener carries only `executePayouts` and binds to 127.0.0.1.

use std::sync::Arc;

use async_trait::async_trait;
use jsonrpsee::core::RpcResult;
use jsonrpsee::server::{ServerBuilder, ServerHandle};
use jsonrpsee::RpcModule;
use tracing::*;
use wdingo_envelope::Envelope;
use wdingo_rpc_api::{
    AuthorityApiServer, CoordinatorApiServer, CreateMintTransactionRequest, ExecutePayoutsRequest,
    ExecutePayoutsResponse, GenerateDepositAddressRequest, LoopbackApiServer, PublicApiServer,
    QueryBurnHistoryRequest, QueryMintBalanceRequest, RegisterMintDepositAddressRequest,
    SubmitWithdrawalRequest,
};

use crate::context::AppContext;
use crate::coordinator;
use crate::errors::AppResult;
use crate::handlers::{admin, mint, payouts, registrar, stats, withdrawal};

#[derive(Clone)]
pub struct AuthorityRpc {
    ctx: Arc<AppContext>,
}

impl AuthorityRpc {
    fn reply<T>(&self, method: &str, result: AppResult<T>) -> RpcResult<T> {
        result.map_err(|err| {
            warn!(%method, %err, "request failed");
            if err.is_fatal() {
                self.ctx.error_log.append(method, &err.to_string());
            }
            err.into()
        })
    }
}

#[async_trait]
impl PublicApiServer for AuthorityRpc {
    async fn ping(&self) -> RpcResult<Envelope> {
        self.reply("ping", admin::ping(&self.ctx).await)
    }

    async fn generate_deposit_address(
        &self,
        req: GenerateDepositAddressRequest,
    ) -> RpcResult<Envelope> {
        self.reply(
            "generateDepositAddress",
            registrar::generate_deposit_address(&self.ctx, req).await,
        )
    }

    async fn register_mint_deposit_address(
        &self,
        req: RegisterMintDepositAddressRequest,
    ) -> RpcResult<Envelope> {
        self.reply(
            "registerMintDepositAddress",
            registrar::register_mint_deposit_address(&self.ctx, req).await,
        )
    }

    async fn query_mint_balance(&self, req: QueryMintBalanceRequest) -> RpcResult<Envelope> {
        self.reply(
            "queryMintBalance",
            mint::query_mint_balance(&self.ctx, req).await,
        )
    }

    async fn create_mint_transaction(
        &self,
        req: CreateMintTransactionRequest,
    ) -> RpcResult<Envelope> {
        self.reply(
            "createMintTransaction",
            mint::create_mint_transaction(&self.ctx, req).await,
        )
    }

    async fn query_burn_history(&self, req: QueryBurnHistoryRequest) -> RpcResult<Envelope> {
        self.reply(
            "queryBurnHistory",
            withdrawal::query_burn_history(&self.ctx, req).await,
        )
    }

    async fn submit_withdrawal(&self, req: SubmitWithdrawalRequest) -> RpcResult<Envelope> {
        self.reply(
            "submitWithdrawal",
            withdrawal::submit_withdrawal(&self.ctx, req).await,
        )
    }

    async fn stats(&self) -> RpcResult<Envelope> {
        self.reply("stats", stats::stats(&self.ctx).await)
    }
}

#[async_trait]
impl AuthorityApiServer for AuthorityRpc {
    async fn compute_pending_payouts(&self, req: Envelope) -> RpcResult<Envelope> {
        self.reply(
            "computePendingPayouts",
            payouts::compute_pending_payouts_endpoint(&self.ctx, req).await,
        )
    }

    async fn compute_unspent(&self, req: Envelope) -> RpcResult<Envelope> {
        self.reply(
            "computeUnspent",
            payouts::compute_unspent_endpoint(&self.ctx, req).await,
        )
    }

    async fn log(&self, req: Envelope) -> RpcResult<Envelope> {
        self.reply("log", admin::log(&self.ctx, req).await)
    }

    async fn dump_database(&self, req: Envelope) -> RpcResult<Envelope> {
        self.reply("dumpDatabase", admin::dump_database(&self.ctx, req).await)
    }

    async fn dingo_does_a_harakiri(&self, req: Envelope) -> RpcResult<Envelope> {
        self.reply(
            "dingoDoesAHarakiri",
            admin::dingo_does_a_harakiri(&self.ctx, req).await,
        )
    }
}

#[async_trait]
impl CoordinatorApiServer for AuthorityRpc {
    async fn approve_payouts(&self, req: Envelope) -> RpcResult<Envelope> {
        self.reply(
            "approvePayouts",
            payouts::approve_payouts_endpoint(&self.ctx, req, false).await,
        )
    }

    async fn approve_payouts_test(&self, req: Envelope) -> RpcResult<Envelope> {
        self.reply(
            "approvePayoutsTest",
            payouts::approve_payouts_endpoint(&self.ctx, req, true).await,
        )
    }
}

#[derive(Clone)]
pub struct LoopbackRpc {
    ctx: Arc<AppContext>,
}

#[async_trait]
impl LoopbackApiServer for LoopbackRpc {
    async fn execute_payouts(
        &self,
        req: ExecutePayoutsRequest,
    ) -> RpcResult<ExecutePayoutsResponse> {
        coordinator::execute_payouts(&self.ctx, req)
            .await
            .map_err(|err| {
                warn!(%err, "executePayouts failed");
                if err.is_fatal() {
                    self.ctx.error_log.append("executePayouts", &err.to_string());
                }
                err.into()
            })
    }
}

pub async fn start(ctx: Arc<AppContext>) -> anyhow::Result<(ServerHandle, ServerHandle)> {
    let rpc = AuthorityRpc { ctx: ctx.clone() };

    let mut module = RpcModule::new(());
    module.merge(PublicApiServer::into_rpc(rpc.clone()))?;
    module.merge(AuthorityApiServer::into_rpc(rpc.clone()))?;
    module.merge(CoordinatorApiServer::into_rpc(rpc.clone()))?;

    let addr = format!(
        "{}:{}",
        ctx.config.node.listen_host, ctx.config.node.listen_port
    );
    let server = ServerBuilder::default().build(&addr).await?;
    let handle = server.start(module);
    info!(%addr, "authority RPC server started");

    let loopback_addr = format!("127.0.0.1:{}", ctx.config.node.loopback_port);
    let loopback_server = ServerBuilder::default().build(&loopback_addr).await?;
    let loopback_handle = loopback_server.start(LoopbackApiServer::into_rpc(LoopbackRpc { ctx }));
    info!(%loopback_addr, "loopback trigger listener started");

    Ok((handle, loopback_handle))
}
