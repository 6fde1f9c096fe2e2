//! Vout construction (the deterministic half of the settlement tx).

use std::collections::BTreeMap;

use wdingo_primitives::{FeeSchedule, PayoutBatch, Sats, UnspentOutput};

use crate::errors::PayoutError;
use crate::validate::{network_fee, total_tax};

/// Builds the vout map for a validated batch.
///
/// * every withdrawal destination receives the sum of its payout amounts;
/// * every tax payout address receives an equal integer share of
///   `total_tax - network_fee`, the flooring remainder falling through to
///   the change vout;
/// * the change address receives whatever the inputs leave over after the
///   payouts and the network fee;
/// * vouts below the dust threshold are dropped.
///
/// A pure function of its inputs; all authorities must arrive at the same
/// map for the same batch or co-signing aborts.
pub fn build_vouts(
    batch: &PayoutBatch,
    unspent: &[UnspentOutput],
    change_address: &str,
    tax_payout_addresses: &[String],
    fees: &FeeSchedule,
) -> Result<BTreeMap<String, Sats>, PayoutError> {
    let tax = total_tax(batch)?;
    let fee = network_fee(batch, fees)?;
    let distributable = tax
        .checked_sub(fee)
        .map_err(|_| PayoutError::InsufficientTaxForFee {
            total_tax: tax,
            network_fee: fee,
        })?;

    fn add(
        vouts: &mut BTreeMap<String, Sats>,
        address: &str,
        amount: Sats,
    ) -> Result<(), PayoutError> {
        let entry = vouts.entry(address.to_owned()).or_insert(Sats::ZERO);
        *entry = entry.checked_add(amount)?;
        Ok(())
    }

    let mut vouts: BTreeMap<String, Sats> = BTreeMap::new();

    for payout in &batch.withdrawal_payouts {
        add(&mut vouts, &payout.burn_destination, payout.amount)?;
    }

    if !distributable.is_zero() {
        if tax_payout_addresses.is_empty() {
            return Err(PayoutError::NoTaxAddresses);
        }
        let share = Sats::from_sat(distributable.to_sat() / tax_payout_addresses.len() as u64);
        for address in tax_payout_addresses {
            add(&mut vouts, address, share)?;
        }
    }

    let available = Sats::checked_sum(unspent.iter().map(|u| u.amount))?;
    let spent = Sats::checked_sum(vouts.values().copied())?.checked_add(fee)?;
    let change = available
        .checked_sub(spent)
        .map_err(|_| PayoutError::InsufficientFunds { available })?;
    add(&mut vouts, change_address, change)?;

    vouts.retain(|_, amount| *amount >= fees.dust_threshold);
    Ok(vouts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wdingo_primitives::amount::COIN;
    use wdingo_primitives::{WithdrawalPayout, WithdrawalTaxPayout};

    const CHANGE: &str = "Dchange";

    fn unspent(amounts: &[u64]) -> Vec<UnspentOutput> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, sat)| UnspentOutput {
                txid: format!("tx{i}"),
                vout: 0,
                address: "Ddeposit".to_owned(),
                amount: Sats::from_sat(*sat),
            })
            .collect()
    }

    fn batch_for_burn(fees: &FeeSchedule, dest: &str, burn: u64) -> PayoutBatch {
        let burn = Sats::from_sat(burn);
        PayoutBatch {
            deposit_tax_payouts: vec![],
            withdrawal_payouts: vec![WithdrawalPayout {
                burn_address: "0xb".to_owned(),
                burn_index: 0,
                burn_destination: dest.to_owned(),
                amount: fees.amount_after_tax(burn).unwrap(),
            }],
            withdrawal_tax_payouts: vec![WithdrawalTaxPayout {
                burn_address: "0xb".to_owned(),
                burn_index: 0,
                burn_destination: dest.to_owned(),
                amount: fees.tax(burn).unwrap(),
            }],
        }
    }

    #[test]
    fn pays_destination_taxes_and_change() {
        let fees = FeeSchedule::default();
        let burn = 20_000 * COIN;
        let batch = batch_for_burn(&fees, "Ddest", burn);
        let tax_addresses = vec!["Dtax1".to_owned(), "Dtax2".to_owned()];
        let inputs = unspent(&[21_000 * COIN]);

        let vouts = build_vouts(&batch, &inputs, CHANGE, &tax_addresses, &fees).unwrap();

        let principal = fees.amount_after_tax(Sats::from_sat(burn)).unwrap();
        let tax = fees.tax(Sats::from_sat(burn)).unwrap();
        let fee = fees.payout_network_fee_per_tx;
        let share = Sats::from_sat((tax.to_sat() - fee.to_sat()) / 2);
        let change = Sats::from_sat(
            21_000 * COIN - principal.to_sat() - 2 * share.to_sat() - fee.to_sat(),
        );

        assert_eq!(vouts["Ddest"], principal);
        assert_eq!(vouts["Dtax1"], share);
        assert_eq!(vouts["Dtax2"], share);
        assert_eq!(vouts[CHANGE], change);
        assert_eq!(vouts.len(), 4);
    }

    #[test]
    fn flooring_remainder_falls_through_to_change() {
        let fees = FeeSchedule::default();
        let burn = 20_000 * COIN + 100; // makes the distributable odd
        let batch = batch_for_burn(&fees, "Ddest", burn);
        let tax_addresses = vec!["Dtax1".to_owned(), "Dtax2".to_owned(), "Dtax3".to_owned()];
        let inputs = unspent(&[21_000 * COIN]);

        let vouts = build_vouts(&batch, &inputs, CHANGE, &tax_addresses, &fees).unwrap();

        let tax = fees.tax(Sats::from_sat(burn)).unwrap();
        let fee = fees.payout_network_fee_per_tx;
        let distributable = tax.to_sat() - fee.to_sat();
        let share = distributable / 3;
        let remainder = distributable - 3 * share;
        assert!(remainder > 0);

        let total_out = Sats::checked_sum(vouts.values().copied()).unwrap();
        // Everything except the network fee is disbursed; the remainder sits
        // in the change vout.
        assert_eq!(
            total_out.checked_add(fee).unwrap(),
            Sats::from_sat(21_000 * COIN)
        );
    }

    #[test]
    fn dust_vouts_are_dropped() {
        let fees = FeeSchedule::default();
        // A burn of exactly the flat fee nets zero principal: dropped.
        let burn = fees.flat_fee.to_sat();
        let mut batch = batch_for_burn(&fees, "Ddest", burn);
        // Make the fee floor pass by adding a large second burn.
        let big = batch_for_burn(&fees, "Dother", 30_000 * COIN);
        batch
            .withdrawal_payouts
            .extend(big.withdrawal_payouts.clone());
        batch
            .withdrawal_tax_payouts
            .extend(big.withdrawal_tax_payouts.clone());

        let inputs = unspent(&[31_000 * COIN]);
        let vouts = build_vouts(&batch, &inputs, CHANGE, &["Dtax1".to_owned()], &fees).unwrap();

        assert!(!vouts.contains_key("Ddest"));
        assert!(vouts.contains_key("Dother"));
    }

    #[test]
    fn shortfall_is_insufficient_funds() {
        let fees = FeeSchedule::default();
        let batch = batch_for_burn(&fees, "Ddest", 20_000 * COIN);
        let inputs = unspent(&[100 * COIN]);

        assert!(matches!(
            build_vouts(&batch, &inputs, CHANGE, &["Dtax1".to_owned()], &fees),
            Err(PayoutError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn empty_batch_consolidates_into_change() {
        let fees = FeeSchedule::default();
        let batch = PayoutBatch::default();
        let inputs = unspent(&[5 * COIN]);

        let vouts = build_vouts(&batch, &inputs, CHANGE, &["Dtax1".to_owned()], &fees).unwrap();
        assert_eq!(vouts.len(), 1);
        assert_eq!(vouts[CHANGE], Sats::from_sat(5 * COIN));
    }
}
