//! The coordinator side of a settlement round.
//!
//! Triggered over the loopback-only listener, this gathers every
//! authority's pending-payout and unspent views, intersects them into the
//! largest batch all nodes agree on, then walks the authorities in
//! configured order to accumulate signatures on the settlement transaction
//! before broadcasting it.

use std::time::Duration;

use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use tracing::*;
use wdingo_envelope::Envelope;
use wdingo_payout_builder::{build_vouts, intersect_batches, intersect_lists};
use wdingo_primitives::{PayoutBatch, UnspentOutput};
use wdingo_rpc_api::{
    ApprovePayoutsRequest, ApprovePayoutsResponse, AuthorityApiClient, ComputePendingPayoutsRequest,
    ComputeUnspentResponse, CoordinatorApiClient, ExecutePayoutsRequest, ExecutePayoutsResponse,
};

use crate::config::AuthorityNode;
use crate::context::AppContext;
use crate::errors::{AppError, AppResult};
use crate::handlers::payouts;

const PEER_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

fn peer_client(node: &AuthorityNode) -> AppResult<HttpClient> {
    HttpClientBuilder::default()
        .request_timeout(PEER_REQUEST_TIMEOUT)
        .build(node.url())
        .map_err(|e| AppError::ChainView(format!("cannot reach authority {}: {e}", node.url())))
}

fn peer_failure(node: &AuthorityNode, err: impl std::fmt::Display) -> AppError {
    AppError::ChainView(format!("authority {} failed: {err}", node.url()))
}

/// Verifies a peer reply envelope (right signer, live anchor) and opens it.
async fn open_reply<T: serde::de::DeserializeOwned>(
    ctx: &AppContext,
    index: usize,
    envelope: &Envelope,
) -> AppResult<T> {
    envelope.verify_signer(ctx.authority_addresses[index])?;
    ctx.check_anchor(envelope).await?;
    Ok(envelope.open()?)
}

pub async fn execute_payouts(
    ctx: &AppContext,
    req: ExecutePayoutsRequest,
) -> AppResult<ExecutePayoutsResponse> {
    if !ctx.is_coordinator() {
        return Err(AppError::Unauthorized(
            "this node is not the payout coordinator".to_owned(),
        ));
    }

    let public = &ctx.config.public;
    let pending_req = ComputePendingPayoutsRequest {
        process_deposits: req.process_deposits,
        process_withdrawals: req.process_withdrawals,
    };

    // Step A: this node's own view.
    let own_batch = payouts::compute_pending(ctx, pending_req).await?;
    let own_unspent = payouts::compute_unspent(ctx).await?;

    // Step B: gather every peer's view and intersect. The coordinator's
    // own lists go first so the intersection keeps its ordering.
    let mut batches: Vec<PayoutBatch> = vec![own_batch];
    let mut unspent_views: Vec<Vec<UnspentOutput>> = vec![own_unspent];

    for (index, node) in public.authority_nodes.iter().enumerate() {
        if index == ctx.own_index {
            continue;
        }
        let client = peer_client(node)?;

        let request = ctx.seal(&pending_req).await?;
        let reply = AuthorityApiClient::compute_pending_payouts(&client, request)
            .await
            .map_err(|e| peer_failure(node, e))?;
        batches.push(open_reply::<PayoutBatch>(ctx, index, &reply).await?);

        let request = ctx.seal(&serde_json::json!({})).await?;
        let reply = AuthorityApiClient::compute_unspent(&client, request)
            .await
            .map_err(|e| peer_failure(node, e))?;
        let response: ComputeUnspentResponse = open_reply(ctx, index, &reply).await?;
        unspent_views.push(response.unspent);
    }

    let batch = intersect_batches(&batches)?;
    let unspent = intersect_lists(&unspent_views);

    if batch.is_empty() {
        info!("no payouts survived the consensus intersection");
        return Ok(ExecutePayoutsResponse {
            deposit_tax_payouts: 0,
            withdrawal_payouts: 0,
            txid: None,
        });
    }

    // Steps C/D on the coordinator itself, yielding the unsigned tx.
    let vouts = build_vouts(
        &batch,
        &unspent,
        &public.change_address,
        &public.tax_payout_addresses,
        &ctx.fees,
    )?;
    let mut chain = ctx.dingo.create_raw_transaction(&unspent, &vouts).await?;

    info!(
        deposits = batch.deposit_tax_payouts.len(),
        withdrawals = batch.withdrawal_payouts.len(),
        inputs = unspent.len(),
        "starting approval walk"
    );

    // Step E: walk the authorities in configured order; each one validates
    // and extends the signature chain. This node takes its turn in place.
    for (index, node) in public.authority_nodes.iter().enumerate() {
        let request = ApprovePayoutsRequest {
            deposit_tax_payouts: batch.deposit_tax_payouts.clone(),
            withdrawal_payouts: batch.withdrawal_payouts.clone(),
            withdrawal_tax_payouts: batch.withdrawal_tax_payouts.clone(),
            unspent: unspent.clone(),
            approval_chain: chain,
        };

        chain = if index == ctx.own_index {
            payouts::approve(ctx, &request, false).await?.approval_chain
        } else {
            let client = peer_client(node)?;
            let envelope = ctx.seal(&request).await?;
            let reply = CoordinatorApiClient::approve_payouts(&client, envelope)
                .await
                .map_err(|e| peer_failure(node, e))?;
            let response: ApprovePayoutsResponse = open_reply(ctx, index, &reply).await?;
            response.approval_chain
        };
    }

    let txid = ctx.dingo.send_raw_transaction(&chain).await?;
    info!(%txid, "settlement transaction broadcast");

    Ok(ExecutePayoutsResponse {
        deposit_tax_payouts: batch.deposit_tax_payouts.len(),
        withdrawal_payouts: batch.withdrawal_payouts.len(),
        txid: Some(txid),
    })
}
