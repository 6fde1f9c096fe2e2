//! API trait definitions for the authority node.
//!
//! Four surfaces, split by who may call them: the public user surface, the
//! authority-to-authority surface (requests are envelopes signed by some
//! authority), the coordinator surface (requests signed by the configured
//! payout coordinator), and the loopback-only settlement trigger. Enabling
//! the `client` feature additionally generates the HTTP clients the
//! coordinator uses to fan out to its peers.

pub mod types;

use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use wdingo_envelope::Envelope;

pub use types::*;

/// Endpoints any user may call. Responses are signed envelopes.
#[cfg_attr(not(feature = "client"), rpc(server))]
#[cfg_attr(feature = "client", rpc(server, client))]
pub trait PublicApi {
    /// Liveness probe.
    #[method(name = "ping")]
    async fn ping(&self) -> RpcResult<Envelope>;

    /// Phase 1 of deposit-address registration: issue a fresh wallet pubkey
    /// for `mintAddress`.
    #[method(name = "generateDepositAddress")]
    async fn generate_deposit_address(
        &self,
        req: GenerateDepositAddressRequest,
    ) -> RpcResult<Envelope>;

    /// Phase 2: bind the multisig address derived from every authority's
    /// phase-1 envelope, in authority order.
    #[method(name = "registerMintDepositAddress")]
    async fn register_mint_deposit_address(
        &self,
        req: RegisterMintDepositAddressRequest,
    ) -> RpcResult<Envelope>;

    #[method(name = "queryMintBalance")]
    async fn query_mint_balance(&self, req: QueryMintBalanceRequest) -> RpcResult<Envelope>;

    /// Issues the mint-authorization signature for the currently mintable
    /// confirmed balance.
    #[method(name = "createMintTransaction")]
    async fn create_mint_transaction(
        &self,
        req: CreateMintTransactionRequest,
    ) -> RpcResult<Envelope>;

    #[method(name = "queryBurnHistory")]
    async fn query_burn_history(&self, req: QueryBurnHistoryRequest) -> RpcResult<Envelope>;

    #[method(name = "submitWithdrawal")]
    async fn submit_withdrawal(&self, req: SubmitWithdrawalRequest) -> RpcResult<Envelope>;

    /// Aggregate local-state snapshot, cached ~10 minutes.
    #[method(name = "stats")]
    async fn stats(&self) -> RpcResult<Envelope>;
}

/// Endpoints restricted to fellow authorities. Each request is an envelope
/// whose signer must be one of the configured authority wallet addresses.
#[cfg_attr(not(feature = "client"), rpc(server))]
#[cfg_attr(feature = "client", rpc(server, client))]
pub trait AuthorityApi {
    /// Read-only replica of the coordinator's pending-payout computation.
    #[method(name = "computePendingPayouts")]
    async fn compute_pending_payouts(&self, req: Envelope) -> RpcResult<Envelope>;

    /// The UTXOs this authority would spend in a settlement round.
    #[method(name = "computeUnspent")]
    async fn compute_unspent(&self, req: Envelope) -> RpcResult<Envelope>;

    /// Contents of the local error log.
    #[method(name = "log")]
    async fn log(&self, req: Envelope) -> RpcResult<Envelope>;

    /// Full store snapshot for divergence repair.
    #[method(name = "dumpDatabase")]
    async fn dump_database(&self, req: Envelope) -> RpcResult<Envelope>;

    /// Coordinated self-termination for restarts/upgrades.
    #[method(name = "dingoDoesAHarakiri")]
    async fn dingo_does_a_harakiri(&self, req: Envelope) -> RpcResult<Envelope>;
}

/// Endpoints only the payout coordinator may call.
#[cfg_attr(not(feature = "client"), rpc(server))]
#[cfg_attr(feature = "client", rpc(server, client))]
pub trait CoordinatorApi {
    /// Validate a settlement batch, co-sign the approval chain, and apply
    /// the payouts to local state.
    #[method(name = "approvePayouts")]
    async fn approve_payouts(&self, req: Envelope) -> RpcResult<Envelope>;

    /// Same validation and signing, but no state mutation and no broadcast.
    #[method(name = "approvePayoutsTest")]
    async fn approve_payouts_test(&self, req: Envelope) -> RpcResult<Envelope>;
}

/// The settlement trigger, served only on the loopback listener of the
/// coordinator node.
#[cfg_attr(not(feature = "client"), rpc(server))]
#[cfg_attr(feature = "client", rpc(server, client))]
pub trait LoopbackApi {
    #[method(name = "executePayouts")]
    async fn execute_payouts(&self, req: ExecutePayoutsRequest)
        -> RpcResult<ExecutePayoutsResponse>;
}
