//! Withdrawal intake and burn-history queries.

use wdingo_envelope::Envelope;
use wdingo_rpc_api::{
    BurnHistoryEntry, Empty, QueryBurnHistoryRequest, QueryBurnHistoryResponse,
    SubmitWithdrawalRequest, WithdrawalStatus,
};

use crate::context::{parse_evm_address, AppContext};
use crate::errors::{AppError, AppResult};

/// Registers a user-reported burn for later settlement. The burn must
/// exist on chain, pay out to a valid Dingo address, and be large enough
/// to carry the flat fee.
pub async fn submit_withdrawal(
    ctx: &AppContext,
    req: SubmitWithdrawalRequest,
) -> AppResult<Envelope> {
    let (burn_addr, burn_address) = parse_evm_address(&req.burn_address)?;

    let _guard = ctx.write_lock.lock().await;

    if ctx
        .store
        .get_withdrawal(&burn_address, req.burn_index)?
        .is_some()
    {
        return Err(AppError::Duplicate(format!(
            "withdrawal ({burn_address}, {}) already submitted",
            req.burn_index
        )));
    }

    let burn = ctx.evm.get_burn_history(burn_addr, req.burn_index).await?;

    let destination = ctx.dingo.validate_address(&burn.burn_destination).await?;
    if !destination.is_valid {
        return Err(AppError::MalformedRequest(format!(
            "burn destination {} is not a valid Dingo address",
            burn.burn_destination
        )));
    }

    if !ctx.fees.meets_tax(burn.burn_amount) {
        return Err(AppError::AmountTooSmall(format!(
            "burn amount {} is below the flat fee {}",
            burn.burn_amount, ctx.fees.flat_fee
        )));
    }

    ctx.store.register_withdrawal(&burn_address, req.burn_index)?;

    ctx.seal(&Empty {}).await
}

/// The burner's full on-chain history annotated with this authority's local
/// submission state.
pub async fn query_burn_history(
    ctx: &AppContext,
    req: QueryBurnHistoryRequest,
) -> AppResult<Envelope> {
    let (burn_addr, burn_address) = parse_evm_address(&req.burn_address)?;

    let burns = ctx.evm.get_burn_history_all(burn_addr).await?;

    let mut burn_history = Vec::with_capacity(burns.len());
    for (index, burn) in burns.into_iter().enumerate() {
        let status = ctx
            .store
            .get_withdrawal(&burn_address, index as u64)?
            .map(|w| {
                if w.is_submitted() {
                    WithdrawalStatus::Submitted
                } else {
                    WithdrawalStatus::Approved
                }
            });
        burn_history.push(BurnHistoryEntry {
            burn_destination: burn.burn_destination,
            burn_amount: burn.burn_amount,
            status,
        });
    }

    ctx.seal(&QueryBurnHistoryResponse { burn_history }).await
}
