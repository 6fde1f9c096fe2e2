//! The signed stats snapshot operators cross-check between authorities.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use wdingo_envelope::Envelope;
use wdingo_primitives::{Sats, UnspentOutput};

use crate::config::PublicSettings;
use crate::context::AppContext;
use crate::errors::{AppError, AppResult};

const STATS_TTL: Duration = Duration::from_secs(600);

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressFunds {
    confirmed: Sats,
    unconfirmed: Sats,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepositStats {
    addresses: BTreeMap<String, AddressFunds>,
    total: AddressFunds,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WithdrawalStats {
    total: usize,
    submitted: usize,
    approved: usize,
    /// What the submitted withdrawals would pay out today.
    pending_approvable_amount: Sats,
    pending_approvable_tax: Sats,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UtxoStats {
    change: AddressFunds,
    deposits: AddressFunds,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DingoStatsSettings {
    rpc_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmartContractSettings {
    provider_url: String,
    chain_id: u64,
    contract_address: String,
}

/// Everything an operator needs to spot a diverged authority: settings
/// echo plus per-address and aggregate balances. Columns disagreeing
/// across nodes mark a consensus failure.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsSnapshot {
    version: String,
    public_settings: PublicSettings,
    dingo_settings: DingoStatsSettings,
    smart_contract_settings: SmartContractSettings,
    deposits: DepositStats,
    withdrawals: WithdrawalStats,
    utxos: UtxoStats,
}

fn sum_unspent(unspent: &[UnspentOutput]) -> AppResult<Sats> {
    Ok(Sats::checked_sum(unspent.iter().map(|u| u.amount))?)
}

async fn utxo_funds(ctx: &AppContext, confirmations: u64, addresses: &[String]) -> AppResult<AddressFunds> {
    if addresses.is_empty() {
        return Ok(AddressFunds::default());
    }
    let confirmed = sum_unspent(&ctx.dingo.list_unspent(confirmations, addresses).await?)?;
    let all = sum_unspent(&ctx.dingo.list_unspent(0, addresses).await?)?;
    Ok(AddressFunds {
        confirmed,
        unconfirmed: all.saturating_sub(confirmed),
    })
}

async fn compute_snapshot(ctx: &AppContext) -> AppResult<StatsSnapshot> {
    let public = &ctx.config.public;

    let bindings = ctx.store.get_mint_bindings(None)?;
    let received_confirmed = ctx
        .dingo
        .list_received_by_address(public.deposit_confirmations)
        .await?;
    let received_all = ctx.dingo.list_received_by_address(0).await?;

    let mut addresses = BTreeMap::new();
    let mut total = AddressFunds::default();
    for binding in &bindings {
        let confirmed = received_confirmed
            .get(&binding.deposit_address)
            .copied()
            .unwrap_or(Sats::ZERO);
        let all = received_all
            .get(&binding.deposit_address)
            .copied()
            .unwrap_or(Sats::ZERO);
        let funds = AddressFunds {
            confirmed,
            unconfirmed: all.saturating_sub(confirmed),
        };
        total.confirmed = total.confirmed.checked_add(funds.confirmed)?;
        total.unconfirmed = total.unconfirmed.checked_add(funds.unconfirmed)?;
        addresses.insert(binding.deposit_address.clone(), funds);
    }

    let all_withdrawals = ctx.store.get_withdrawals()?;
    let mut withdrawals = WithdrawalStats {
        total: all_withdrawals.len(),
        submitted: 0,
        approved: 0,
        pending_approvable_amount: Sats::ZERO,
        pending_approvable_tax: Sats::ZERO,
    };
    for withdrawal in &all_withdrawals {
        if !withdrawal.is_submitted() {
            withdrawals.approved += 1;
            continue;
        }
        withdrawals.submitted += 1;

        let burn_addr = withdrawal.burn_address.parse().map_err(|_| {
            AppError::Internal(format!(
                "stored burn address {} is invalid",
                withdrawal.burn_address
            ))
        })?;
        let burn = ctx
            .evm
            .get_burn_history(burn_addr, withdrawal.burn_index)
            .await?;
        if ctx.fees.meets_tax(burn.burn_amount) {
            withdrawals.pending_approvable_amount = withdrawals
                .pending_approvable_amount
                .checked_add(ctx.fees.amount_after_tax(burn.burn_amount)?)?;
            withdrawals.pending_approvable_tax = withdrawals
                .pending_approvable_tax
                .checked_add(ctx.fees.tax(burn.burn_amount)?)?;
        }
    }

    let deposit_addresses: Vec<String> =
        bindings.iter().map(|b| b.deposit_address.clone()).collect();
    let utxos = UtxoStats {
        change: utxo_funds(
            ctx,
            public.change_confirmations,
            std::slice::from_ref(&public.change_address),
        )
        .await?,
        deposits: utxo_funds(ctx, public.deposit_confirmations, &deposit_addresses).await?,
    };

    Ok(StatsSnapshot {
        version: env!("CARGO_PKG_VERSION").to_owned(),
        public_settings: public.clone(),
        dingo_settings: DingoStatsSettings {
            rpc_url: ctx.config.dingo.rpc_url.clone(),
        },
        smart_contract_settings: SmartContractSettings {
            provider_url: ctx.config.evm.provider_url.clone(),
            chain_id: ctx.config.evm.chain_id,
            contract_address: ctx.config.evm.contract_address.clone(),
        },
        deposits: DepositStats { addresses, total },
        withdrawals,
        utxos,
    })
}

/// Serves the cached snapshot, recomputing at most once per TTL. The cache
/// lock doubles as the stampede guard: concurrent callers wait for one
/// recomputation instead of each issuing their own chain RPCs.
pub async fn stats(ctx: &AppContext) -> AppResult<Envelope> {
    let payload = {
        let mut cache = ctx.stats_cache.lock().await;
        let fresh = cache
            .as_ref()
            .filter(|(at, _)| at.elapsed() < STATS_TTL)
            .map(|(_, value)| value.clone());
        match fresh {
            Some(value) => value,
            None => {
                let snapshot = compute_snapshot(ctx).await?;
                let value = serde_json::to_value(&snapshot)
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                *cache = Some((Instant::now(), value.clone()));
                value
            }
        }
    };

    ctx.seal(&payload).await
}
