//! The payout engine: pending-payout computation, unspent selection, and
//! the co-signing endpoint every settlement round walks through.

use std::collections::BTreeMap;

use tracing::*;
use wdingo_db::Withdrawal;
use wdingo_envelope::Envelope;
use wdingo_payout_builder::{build_vouts, validate_batch, BatchContext};
use wdingo_primitives::{BurnRecord, PayoutBatch, UnspentOutput};
use wdingo_rpc_api::{
    ApprovePayoutsRequest, ApprovePayoutsResponse, ComputePendingPayoutsRequest,
    ComputeUnspentResponse,
};

use crate::context::AppContext;
use crate::errors::{AppError, AppResult};

/// Computes the pending payout lists from local state and fresh chain
/// reads. Runs without the write lock: it is a read-only snapshot that
/// every authority recomputes and that gets re-validated under the lock
/// before anything is signed.
pub async fn compute_pending(
    ctx: &AppContext,
    req: ComputePendingPayoutsRequest,
) -> AppResult<PayoutBatch> {
    if !req.process_deposits && !req.process_withdrawals {
        return Err(AppError::MalformedRequest(
            "at least one of processDeposits/processWithdrawals must be set".to_owned(),
        ));
    }

    let mut batch = PayoutBatch::default();

    if req.process_deposits {
        let bindings = ctx.store.get_mint_bindings(None)?;
        let received = ctx
            .dingo
            .list_received_by_address(ctx.config.public.deposit_confirmations)
            .await?;
        batch.deposit_tax_payouts =
            wdingo_payout_builder::compute_deposit_tax_payouts(&bindings, &received, &ctx.fees)?;
    }

    if req.process_withdrawals {
        let unapproved = ctx.store.get_unapproved_withdrawals()?;
        let mut pending = Vec::with_capacity(unapproved.len());
        for withdrawal in unapproved {
            let burn = lookup_burn(ctx, &withdrawal).await?;
            pending.push((withdrawal, burn));
        }
        let (payouts, tax_payouts) =
            wdingo_payout_builder::compute_withdrawal_payouts(&pending, &ctx.fees)?;
        batch.withdrawal_payouts = payouts;
        batch.withdrawal_tax_payouts = tax_payouts;
    }

    Ok(batch)
}

/// The UTXO set a settlement round would spend: confirmed change plus
/// everything sitting on the bound deposit addresses.
pub async fn compute_unspent(ctx: &AppContext) -> AppResult<Vec<UnspentOutput>> {
    let public = &ctx.config.public;

    let mut unspent = ctx
        .dingo
        .list_unspent(
            public.change_confirmations,
            std::slice::from_ref(&public.change_address),
        )
        .await?;

    let deposit_addresses: Vec<String> = ctx
        .store
        .get_mint_bindings(None)?
        .into_iter()
        .map(|b| b.deposit_address)
        .collect();
    if !deposit_addresses.is_empty() {
        unspent.extend(
            ctx.dingo
                .list_unspent(public.deposit_confirmations, &deposit_addresses)
                .await?,
        );
    }

    Ok(unspent)
}

async fn lookup_burn(ctx: &AppContext, withdrawal: &Withdrawal) -> AppResult<BurnRecord> {
    let burn_addr = withdrawal
        .burn_address
        .parse()
        .map_err(|_| AppError::Internal(format!("stored burn address {} is invalid", withdrawal.burn_address)))?;
    Ok(ctx
        .evm
        .get_burn_history(burn_addr, withdrawal.burn_index)
        .await?)
}

/// The co-signing critical section, shared by `approvePayouts` and its
/// dry-run twin. Assumes the caller has already authenticated the
/// coordinator envelope.
///
/// Everything from re-validation to the local state change happens under
/// the write lock, which is what makes the SUBMITTED -> APPROVED
/// transition at-most-once.
pub async fn approve(
    ctx: &AppContext,
    req: &ApprovePayoutsRequest,
    test_mode: bool,
) -> AppResult<ApprovePayoutsResponse> {
    let batch = req.batch();

    let _guard = ctx.write_lock.lock().await;

    // (a) The inputs must be UTXOs this node itself would spend.
    let own_unspent = compute_unspent(ctx).await?;
    for utxo in &req.unspent {
        if !own_unspent.contains(utxo) {
            return Err(AppError::Consensus(format!(
                "unspent {}:{} is not in this node's view",
                utxo.txid, utxo.vout
            )));
        }
    }

    // (b) Re-validate the batch against local state and fresh chain reads.
    let bindings_by_deposit: BTreeMap<String, _> = ctx
        .store
        .get_mint_bindings(None)?
        .into_iter()
        .map(|b| (b.deposit_address.clone(), b))
        .collect();
    let withdrawals: BTreeMap<(String, u64), Withdrawal> = ctx
        .store
        .get_withdrawals()?
        .into_iter()
        .map(|w| ((w.burn_address.clone(), w.burn_index), w))
        .collect();

    let mut burns: BTreeMap<(String, u64), BurnRecord> = BTreeMap::new();
    for payout in &batch.withdrawal_payouts {
        let key = (payout.burn_address.clone(), payout.burn_index);
        if let Some(withdrawal) = withdrawals.get(&key) {
            burns.insert(key, lookup_burn(ctx, withdrawal).await?);
        }
    }

    let received = ctx
        .dingo
        .list_received_by_address(ctx.config.public.deposit_confirmations)
        .await?;

    validate_batch(
        &batch,
        &BatchContext {
            fees: &ctx.fees,
            bindings_by_deposit: &bindings_by_deposit,
            withdrawals: &withdrawals,
            burns: &burns,
            received: &received,
        },
    )?;

    // (c) Recompute the vouts and insist the raw transaction matches them.
    let vouts = build_vouts(
        &batch,
        &req.unspent,
        &ctx.config.public.change_address,
        &ctx.config.public.tax_payout_addresses,
        &ctx.fees,
    )?;
    ctx.dingo
        .verify_raw_transaction(&req.unspent, &vouts, &req.approval_chain)
        .await?;

    // (d) Add this authority's signatures.
    let signed = ctx.dingo.sign_raw_transaction(&req.approval_chain).await?;

    // (e) Apply the payouts locally. Test mode signs but leaves state
    // untouched.
    if !test_mode {
        let mut updated_bindings = Vec::with_capacity(batch.deposit_tax_payouts.len());
        for payout in &batch.deposit_tax_payouts {
            let mut binding = bindings_by_deposit
                .get(&payout.deposit_address)
                .cloned()
                .ok_or_else(|| {
                    AppError::Consensus(format!(
                        "deposit address {} vanished during approval",
                        payout.deposit_address
                    ))
                })?;
            binding.approved_tax = binding.approved_tax.checked_add(payout.amount)?;
            updated_bindings.push(binding);
        }

        let mut updated_withdrawals = Vec::with_capacity(batch.withdrawal_payouts.len());
        for (payout, tax_payout) in batch
            .withdrawal_payouts
            .iter()
            .zip(&batch.withdrawal_tax_payouts)
        {
            updated_withdrawals.push(Withdrawal {
                burn_address: payout.burn_address.clone(),
                burn_index: payout.burn_index,
                approved_amount: payout.amount,
                approved_tax: tax_payout.amount,
            });
        }

        if !updated_bindings.is_empty() {
            ctx.store.update_mint_bindings(&updated_bindings)?;
        }
        if !updated_withdrawals.is_empty() {
            ctx.store.update_withdrawals(&updated_withdrawals)?;
        }

        info!(
            deposits = updated_bindings.len(),
            withdrawals = updated_withdrawals.len(),
            "applied payout batch"
        );
    }

    Ok(ApprovePayoutsResponse {
        approval_chain: signed.hex,
    })
}

/// `computePendingPayouts` endpoint: authority-authenticated, read-only.
pub async fn compute_pending_payouts_endpoint(
    ctx: &AppContext,
    envelope: Envelope,
) -> AppResult<Envelope> {
    ctx.authenticate_authority(&envelope).await?;
    let req: ComputePendingPayoutsRequest = envelope.open()?;
    let batch = compute_pending(ctx, req).await?;
    ctx.seal(&batch).await
}

/// `computeUnspent` endpoint: authority-authenticated, read-only.
pub async fn compute_unspent_endpoint(ctx: &AppContext, envelope: Envelope) -> AppResult<Envelope> {
    ctx.authenticate_authority(&envelope).await?;
    let unspent = compute_unspent(ctx).await?;
    ctx.seal(&ComputeUnspentResponse { unspent }).await
}

/// `approvePayouts`/`approvePayoutsTest` endpoints.
pub async fn approve_payouts_endpoint(
    ctx: &AppContext,
    envelope: Envelope,
    test_mode: bool,
) -> AppResult<Envelope> {
    ctx.authenticate_coordinator(&envelope).await?;
    let req: ApprovePayoutsRequest = envelope.open()?;
    let response = approve(ctx, &req, test_mode).await?;
    ctx.seal(&response).await
}
