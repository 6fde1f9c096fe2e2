//! Mint balance queries and mint-authorization signatures.

use alloy::primitives::Address;
use wdingo_db::MintBinding;
use wdingo_envelope::Envelope;
use wdingo_evmio::MintHistory;
use wdingo_primitives::Sats;
use wdingo_rpc_api::{
    CreateMintTransactionRequest, CreateMintTransactionResponse, QueryMintBalanceRequest,
    QueryMintBalanceResponse,
};

use crate::context::{parse_evm_address, AppContext};
use crate::errors::{AppError, AppResult};

struct MintView {
    mint_addr: Address,
    binding: MintBinding,
    mintable_confirmed: Sats,
    mintable_unconfirmed: Sats,
    history: MintHistory,
}

/// Gathers everything a mint decision needs: the binding, what the deposit
/// address holds (taxed, confirmed and not), and the contract's view of
/// what was already minted.
async fn mint_view(ctx: &AppContext, mint_address: &str) -> AppResult<MintView> {
    let (mint_addr, mint_address) = parse_evm_address(mint_address)?;

    let binding = ctx
        .store
        .get_mint_binding(&mint_address)?
        .ok_or_else(|| {
            AppError::MalformedRequest(format!("mint address {mint_address} is not registered"))
        })?;

    let confirmed = ctx
        .dingo
        .list_received_by_address(ctx.config.public.deposit_confirmations)
        .await?
        .remove(&binding.deposit_address)
        .unwrap_or(Sats::ZERO);
    let total = ctx
        .dingo
        .list_received_by_address(0)
        .await?
        .remove(&binding.deposit_address)
        .unwrap_or(Sats::ZERO);
    let unconfirmed = total.saturating_sub(confirmed);

    let mintable = |amount: Sats| -> AppResult<Sats> {
        if ctx.fees.meets_tax(amount) {
            Ok(ctx.fees.amount_after_tax(amount)?)
        } else {
            Ok(Sats::ZERO)
        }
    };

    let history = ctx
        .evm
        .get_mint_history(mint_addr, &binding.deposit_address)
        .await?;

    Ok(MintView {
        mint_addr,
        mintable_confirmed: mintable(confirmed)?,
        mintable_unconfirmed: mintable(unconfirmed)?,
        binding,
        history,
    })
}

pub async fn query_mint_balance(
    ctx: &AppContext,
    req: QueryMintBalanceRequest,
) -> AppResult<Envelope> {
    let view = mint_view(ctx, &req.mint_address).await?;

    ctx.seal(&QueryMintBalanceResponse {
        mint_nonce: view.history.mint_nonce,
        mint_address: view.binding.mint_address,
        deposit_address: view.binding.deposit_address,
        deposited_amount: view.mintable_confirmed,
        unconfirmed_amount: view.mintable_unconfirmed,
        minted_amount: view.history.minted_amount,
    })
    .await
}

/// Issues the contract-verifiable signature for whatever confirmed balance
/// has not been minted yet. The mint nonce comes from the contract and is
/// only advanced on chain when the user executes the mint.
pub async fn create_mint_transaction(
    ctx: &AppContext,
    req: CreateMintTransactionRequest,
) -> AppResult<Envelope> {
    let view = mint_view(ctx, &req.mint_address).await?;

    let mint_amount = view
        .mintable_confirmed
        .saturating_sub(view.history.minted_amount);

    let verification = ctx
        .evm
        .sign_mint_transaction(
            view.mint_addr,
            view.history.mint_nonce,
            &view.binding.deposit_address,
            mint_amount,
        )
        .await?;

    ctx.seal(&CreateMintTransactionResponse {
        mint_address: view.binding.mint_address,
        mint_nonce: view.history.mint_nonce,
        deposit_address: view.binding.deposit_address,
        mint_amount,
        on_contract_verification: verification,
    })
    .await
}
