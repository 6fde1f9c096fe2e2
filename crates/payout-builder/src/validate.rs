//! Batch validation, re-run by every authority inside its write lock before
//! it signs anything.

use std::collections::BTreeMap;

use wdingo_db::{MintBinding, Withdrawal};
use wdingo_primitives::{BurnRecord, FeeSchedule, PayoutBatch, Sats};

use crate::errors::PayoutError;

/// The local state a batch is validated against. All maps reflect this
/// authority's own store and chain reads, not anything the coordinator
/// claimed.
pub struct BatchContext<'a> {
    pub fees: &'a FeeSchedule,
    /// Bindings keyed by deposit address.
    pub bindings_by_deposit: &'a BTreeMap<String, MintBinding>,
    /// Withdrawals keyed by `(burn_address, burn_index)`.
    pub withdrawals: &'a BTreeMap<(String, u64), Withdrawal>,
    /// On-chain burns keyed by `(burn_address, burn_index)`.
    pub burns: &'a BTreeMap<(String, u64), BurnRecord>,
    /// Confirmed received amount per deposit address.
    pub received: &'a BTreeMap<String, Sats>,
}

/// Total tax carried by a batch.
pub fn total_tax(batch: &PayoutBatch) -> Result<Sats, PayoutError> {
    let deposit_tax = Sats::checked_sum(batch.deposit_tax_payouts.iter().map(|p| p.amount))?;
    let withdrawal_tax =
        Sats::checked_sum(batch.withdrawal_tax_payouts.iter().map(|p| p.amount))?;
    Ok(deposit_tax.checked_add(withdrawal_tax)?)
}

/// Network fee owed by a batch: one contribution per deposit-tax payout and
/// per withdrawal payout. Withdrawal tax payouts are deliberately excluded
/// from the count.
pub fn network_fee(batch: &PayoutBatch, fees: &FeeSchedule) -> Result<Sats, PayoutError> {
    Ok(fees.network_fee(batch.deposit_tax_payouts.len() + batch.withdrawal_payouts.len())?)
}

pub fn validate_batch(batch: &PayoutBatch, ctx: &BatchContext<'_>) -> Result<(), PayoutError> {
    let tax = total_tax(batch)?;
    let fee = network_fee(batch, ctx.fees)?;
    if tax < fee {
        return Err(PayoutError::InsufficientTaxForFee {
            total_tax: tax,
            network_fee: fee,
        });
    }

    for payout in &batch.deposit_tax_payouts {
        let binding = ctx
            .bindings_by_deposit
            .get(&payout.deposit_address)
            .ok_or_else(|| PayoutError::UnknownDepositAddress(payout.deposit_address.clone()))?;

        let balance = ctx
            .received
            .get(&payout.deposit_address)
            .copied()
            .unwrap_or(Sats::ZERO);
        if !ctx.fees.meets_tax(balance) {
            return Err(PayoutError::DepositBelowTaxThreshold(
                payout.deposit_address.clone(),
            ));
        }

        let approvable = ctx.fees.tax(balance)?;
        let after = payout.amount.checked_add(binding.approved_tax)?;
        if after > approvable {
            return Err(PayoutError::DepositTaxOvershoot(
                payout.deposit_address.clone(),
            ));
        }
    }

    if batch.withdrawal_payouts.len() != batch.withdrawal_tax_payouts.len() {
        return Err(PayoutError::UnpairedWithdrawalPayouts);
    }

    for (index, (payout, tax_payout)) in batch
        .withdrawal_payouts
        .iter()
        .zip(&batch.withdrawal_tax_payouts)
        .enumerate()
    {
        if payout.burn_address != tax_payout.burn_address
            || payout.burn_index != tax_payout.burn_index
            || payout.burn_destination != tax_payout.burn_destination
        {
            return Err(PayoutError::MismatchedWithdrawalPair(index));
        }

        let key = (payout.burn_address.clone(), payout.burn_index);
        let withdrawal = ctx
            .withdrawals
            .get(&key)
            .ok_or_else(|| PayoutError::WithdrawalNotFound(key.0.clone(), key.1))?;
        if !withdrawal.is_submitted() {
            return Err(PayoutError::WithdrawalAlreadyApproved(
                key.0.clone(),
                key.1,
            ));
        }

        let burn = ctx
            .burns
            .get(&key)
            .ok_or_else(|| PayoutError::BurnMismatch(key.0.clone(), key.1))?;
        if burn.burn_destination != payout.burn_destination
            || !ctx.fees.meets_tax(burn.burn_amount)
            || payout.amount != ctx.fees.amount_after_tax(burn.burn_amount)?
            || tax_payout.amount != ctx.fees.tax(burn.burn_amount)?
        {
            return Err(PayoutError::BurnMismatch(key.0.clone(), key.1));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wdingo_primitives::amount::COIN;
    use wdingo_primitives::{DepositTaxPayout, WithdrawalPayout, WithdrawalTaxPayout};

    struct Fixture {
        fees: FeeSchedule,
        bindings_by_deposit: BTreeMap<String, MintBinding>,
        withdrawals: BTreeMap<(String, u64), Withdrawal>,
        burns: BTreeMap<(String, u64), BurnRecord>,
        received: BTreeMap<String, Sats>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                fees: FeeSchedule::default(),
                bindings_by_deposit: BTreeMap::new(),
                withdrawals: BTreeMap::new(),
                burns: BTreeMap::new(),
                received: BTreeMap::new(),
            }
        }

        fn ctx(&self) -> BatchContext<'_> {
            BatchContext {
                fees: &self.fees,
                bindings_by_deposit: &self.bindings_by_deposit,
                withdrawals: &self.withdrawals,
                burns: &self.burns,
                received: &self.received,
            }
        }

        fn with_deposit(mut self, deposit: &str, balance: u64) -> Self {
            self.bindings_by_deposit.insert(
                deposit.to_owned(),
                MintBinding::new(
                    format!("0xmint-{deposit}"),
                    deposit.to_owned(),
                    "52ae".to_owned(),
                ),
            );
            self.received
                .insert(deposit.to_owned(), Sats::from_sat(balance));
            self
        }

        fn with_burn(mut self, address: &str, index: u64, dest: &str, amount: u64) -> Self {
            self.withdrawals.insert(
                (address.to_owned(), index),
                Withdrawal::submitted(address.to_owned(), index),
            );
            self.burns.insert(
                (address.to_owned(), index),
                BurnRecord {
                    burn_destination: dest.to_owned(),
                    burn_amount: Sats::from_sat(amount),
                },
            );
            self
        }
    }

    fn withdrawal_pair(
        fees: &FeeSchedule,
        address: &str,
        index: u64,
        dest: &str,
        burn_amount: u64,
    ) -> (WithdrawalPayout, WithdrawalTaxPayout) {
        let burn = Sats::from_sat(burn_amount);
        (
            WithdrawalPayout {
                burn_address: address.to_owned(),
                burn_index: index,
                burn_destination: dest.to_owned(),
                amount: fees.amount_after_tax(burn).unwrap(),
            },
            WithdrawalTaxPayout {
                burn_address: address.to_owned(),
                burn_index: index,
                burn_destination: dest.to_owned(),
                amount: fees.tax(burn).unwrap(),
            },
        )
    }

    #[test]
    fn small_batch_fails_the_fee_floor() {
        // One 50-coin deposit plus one 80-coin burn: 21.1 coins of tax
        // against a 40-coin network fee.
        let fx = Fixture::new()
            .with_deposit("Dx", 50 * COIN)
            .with_burn("0xb", 3, "Ddest", 80 * COIN);
        let (wp, wtp) = withdrawal_pair(&fx.fees, "0xb", 3, "Ddest", 80 * COIN);
        let batch = PayoutBatch {
            deposit_tax_payouts: vec![DepositTaxPayout {
                deposit_address: "Dx".to_owned(),
                amount: fx.fees.tax(Sats::from_sat(50 * COIN)).unwrap(),
            }],
            withdrawal_payouts: vec![wp],
            withdrawal_tax_payouts: vec![wtp],
        };

        let tax = total_tax(&batch).unwrap();
        let fee = network_fee(&batch, &fx.fees).unwrap();
        assert_eq!(tax, Sats::from_sat(2_110_000_000));
        assert_eq!(fee, Sats::from_sat(4_000_000_000));
        assert!(matches!(
            validate_batch(&batch, &fx.ctx()),
            Err(PayoutError::InsufficientTaxForFee { .. })
        ));
    }

    #[test]
    fn medium_batches_still_fail_the_fee_floor() {
        // Ten then fifty withdrawals of 200 coins each; the per-payout fee
        // contribution outruns the 1% tax either way.
        for count in [10u64, 50] {
            let mut fx = Fixture::new();
            let mut batch = PayoutBatch::default();
            for i in 0..count {
                fx = fx.with_burn("0xb", i, &format!("Dd{i}"), 200 * COIN);
                let (wp, wtp) =
                    withdrawal_pair(&fx.fees, "0xb", i, &format!("Dd{i}"), 200 * COIN);
                batch.withdrawal_payouts.push(wp);
                batch.withdrawal_tax_payouts.push(wtp);
            }

            let tax = total_tax(&batch).unwrap();
            let fee = network_fee(&batch, &fx.fees).unwrap();
            let per_burn_tax = fx.fees.tax(Sats::from_sat(200 * COIN)).unwrap();
            assert_eq!(tax.to_sat(), count * per_burn_tax.to_sat());
            assert_eq!(
                fee.to_sat(),
                count * fx.fees.payout_network_fee_per_tx.to_sat()
            );
            assert!(tax < fee);
            assert!(matches!(
                validate_batch(&batch, &fx.ctx()),
                Err(PayoutError::InsufficientTaxForFee { .. })
            ));
        }
    }

    #[test]
    fn large_burn_clears_the_fee_floor() {
        let burn = 20_000 * COIN;
        let fx = Fixture::new().with_burn("0xb", 0, "Ddest", burn);
        let (wp, wtp) = withdrawal_pair(&fx.fees, "0xb", 0, "Ddest", burn);
        let batch = PayoutBatch {
            deposit_tax_payouts: vec![],
            withdrawal_payouts: vec![wp],
            withdrawal_tax_payouts: vec![wtp],
        };

        assert!(total_tax(&batch).unwrap() >= network_fee(&batch, &fx.fees).unwrap());
        validate_batch(&batch, &fx.ctx()).unwrap();
    }

    #[test]
    fn approved_withdrawal_cannot_be_paid_twice() {
        let burn = 20_000 * COIN;
        let mut fx = Fixture::new().with_burn("0xb", 0, "Ddest", burn);
        let (wp, wtp) = withdrawal_pair(&fx.fees, "0xb", 0, "Ddest", burn);
        let batch = PayoutBatch {
            deposit_tax_payouts: vec![],
            withdrawal_payouts: vec![wp],
            withdrawal_tax_payouts: vec![wtp],
        };

        let approved = Withdrawal {
            burn_address: "0xb".to_owned(),
            burn_index: 0,
            approved_amount: fx.fees.amount_after_tax(Sats::from_sat(burn)).unwrap(),
            approved_tax: fx.fees.tax(Sats::from_sat(burn)).unwrap(),
        };
        fx.withdrawals.insert(("0xb".to_owned(), 0), approved);

        assert!(matches!(
            validate_batch(&batch, &fx.ctx()),
            Err(PayoutError::WithdrawalAlreadyApproved(_, 0))
        ));
    }

    #[test]
    fn burn_mismatch_is_rejected() {
        let burn = 20_000 * COIN;
        let fx = Fixture::new().with_burn("0xb", 0, "Ddest", burn);
        let (mut wp, wtp) = withdrawal_pair(&fx.fees, "0xb", 0, "Ddest", burn);
        wp.amount = wp.amount.checked_add(Sats::from_sat(1)).unwrap();
        let batch = PayoutBatch {
            deposit_tax_payouts: vec![],
            withdrawal_payouts: vec![wp],
            withdrawal_tax_payouts: vec![wtp],
        };

        assert!(matches!(
            validate_batch(&batch, &fx.ctx()),
            Err(PayoutError::BurnMismatch(_, 0))
        ));
    }

    #[test]
    fn pair_key_mismatch_is_rejected() {
        let burn = 20_000 * COIN;
        let fx = Fixture::new()
            .with_burn("0xb", 0, "Ddest", burn)
            .with_burn("0xb", 1, "Ddest", burn);
        let (wp, _) = withdrawal_pair(&fx.fees, "0xb", 0, "Ddest", burn);
        let (_, wtp_other) = withdrawal_pair(&fx.fees, "0xb", 1, "Ddest", burn);
        let batch = PayoutBatch {
            deposit_tax_payouts: vec![],
            withdrawal_payouts: vec![wp],
            withdrawal_tax_payouts: vec![wtp_other],
        };

        assert!(matches!(
            validate_batch(&batch, &fx.ctx()),
            Err(PayoutError::MismatchedWithdrawalPair(0))
        ));
    }

    #[test]
    fn deposit_tax_cannot_overshoot_the_ceiling() {
        let fx = Fixture::new().with_deposit("Dx", 10_000 * COIN);
        let approvable = fx.fees.tax(Sats::from_sat(10_000 * COIN)).unwrap();
        let batch = PayoutBatch {
            deposit_tax_payouts: vec![DepositTaxPayout {
                deposit_address: "Dx".to_owned(),
                amount: approvable.checked_add(Sats::from_sat(1)).unwrap(),
            }],
            withdrawal_payouts: vec![],
            withdrawal_tax_payouts: vec![],
        };

        assert!(matches!(
            validate_batch(&batch, &fx.ctx()),
            Err(PayoutError::DepositTaxOvershoot(_))
        ));
    }
}
