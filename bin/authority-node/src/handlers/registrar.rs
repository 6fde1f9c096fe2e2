//! Mint-address registration (phases 1 and 2 of the three-phase protocol).

use wdingo_db::MintBinding;
use wdingo_envelope::Envelope;
use wdingo_rpc_api::{
    GenerateDepositAddressRequest, GenerateDepositAddressResponse,
    RegisterMintDepositAddressRequest, RegisterMintDepositAddressResponse,
};

use crate::context::{parse_evm_address, AppContext};
use crate::errors::{AppError, AppResult};

/// Phase 1: hand out a fresh wallet pubkey bound (by signature) to the
/// requested mint address. The pubkey is not marked used yet; that happens
/// when a full set of N envelopes comes back in phase 2.
pub async fn generate_deposit_address(
    ctx: &AppContext,
    req: GenerateDepositAddressRequest,
) -> AppResult<Envelope> {
    let (_, mint_address) = parse_evm_address(&req.mint_address)?;

    let pubkey = ctx.dingo.get_new_pubkey().await?;

    ctx.seal(&GenerateDepositAddressResponse {
        mint_address,
        deposit_address: pubkey,
    })
    .await
}

/// Phase 2: verify all N phase-1 envelopes positionally, derive the
/// multisig deposit address, and bind it.
///
/// Every authority runs this with identical inputs, so all of them must
/// arrive at the same multisig address; a client seeing disagreement
/// surfaces a consensus failure.
pub async fn register_mint_deposit_address(
    ctx: &AppContext,
    req: RegisterMintDepositAddressRequest,
) -> AppResult<Envelope> {
    let n = ctx.config.public.authority_nodes.len();
    let responses = &req.generate_deposit_address_responses;
    if responses.len() != n {
        return Err(AppError::MalformedRequest(format!(
            "expected {n} generateDepositAddress responses, got {}",
            responses.len()
        )));
    }

    // Positional check: response i must be signed by authority i, on a
    // still-live chain anchor. Replayed stale envelopes die here.
    let mut payloads = Vec::with_capacity(n);
    for (index, envelope) in responses.iter().enumerate() {
        envelope
            .verify_signer(ctx.authority_addresses[index])
            .map_err(|_| {
                AppError::Unauthorized(format!(
                    "response {index} is not signed by authority {index}"
                ))
            })?;
        ctx.check_anchor(envelope).await?;
        payloads.push(envelope.open::<GenerateDepositAddressResponse>()?);
    }

    let (_, mint_address) = parse_evm_address(&payloads[0].mint_address)?;
    if payloads.iter().any(|p| p.mint_address != mint_address) {
        return Err(AppError::Consensus(
            "responses disagree on the mint address".to_owned(),
        ));
    }

    let pubkeys: Vec<String> = payloads.into_iter().map(|p| p.deposit_address).collect();
    for (index, pubkey) in pubkeys.iter().enumerate() {
        if pubkeys[..index].contains(pubkey) {
            return Err(AppError::Duplicate(format!(
                "pubkey {pubkey} appears twice in the responses"
            )));
        }
    }

    let _guard = ctx.write_lock.lock().await;

    if ctx.store.has_used_deposit_pubkeys(&pubkeys)? {
        return Err(AppError::Duplicate(
            "a deposit pubkey has already been used".to_owned(),
        ));
    }
    if ctx.store.get_mint_binding(&mint_address)?.is_some() {
        return Err(AppError::Duplicate(format!(
            "mint address {mint_address} is already bound"
        )));
    }

    // Deterministic: same pubkeys in the same authority order on every
    // node, so every node derives the same address and redeem script.
    let multisig = ctx
        .dingo
        .create_multisig(ctx.config.public.authority_threshold, &pubkeys)
        .await?;
    if ctx
        .store
        .get_mint_binding_by_deposit_address(&multisig.address)?
        .is_some()
    {
        return Err(AppError::Duplicate(format!(
            "deposit address {} is already bound",
            multisig.address
        )));
    }

    // Watch the address so deposits show up in listreceivedbyaddress and
    // the daemon can co-sign spends from it later.
    ctx.dingo.import_address(&multisig.redeem_script).await?;

    ctx.store.register_used_deposit_pubkeys(&pubkeys)?;
    ctx.store.register_mint_binding(MintBinding::new(
        mint_address,
        multisig.address.clone(),
        multisig.redeem_script,
    ))?;

    ctx.seal(&RegisterMintDepositAddressResponse {
        deposit_address: multisig.address,
    })
    .await
}
