//! Pending-payout computation (the read-only phase of a settlement round).

use std::collections::BTreeMap;

use wdingo_db::{MintBinding, Withdrawal};
use wdingo_primitives::{
    BurnRecord, DepositTaxPayout, FeeSchedule, Sats, WithdrawalPayout, WithdrawalTaxPayout,
};

use crate::errors::PayoutError;

/// Deposit-tax payouts owed on the confirmed balances in `received`.
///
/// For every binding whose deposit address carries a taxable confirmed
/// balance, the authority owes the difference between the tax on that
/// balance and what it has already co-signed. Confirmed balances only grow,
/// so a stored `approved_tax` above the approvable ceiling means local
/// state is corrupt and the round must abort.
pub fn compute_deposit_tax_payouts(
    bindings: &[MintBinding],
    received: &BTreeMap<String, Sats>,
    fees: &FeeSchedule,
) -> Result<Vec<DepositTaxPayout>, PayoutError> {
    let mut payouts = Vec::new();

    for binding in bindings {
        let Some(&balance) = received.get(&binding.deposit_address) else {
            continue;
        };
        if !fees.meets_tax(balance) {
            continue;
        }

        let approvable = fees.tax(balance)?;
        let approved = binding.approved_tax;

        if approvable < approved {
            return Err(PayoutError::AccountingInvariantViolated {
                deposit_address: binding.deposit_address.clone(),
                approvable,
                approved,
            });
        }
        if approvable > approved {
            payouts.push(DepositTaxPayout {
                deposit_address: binding.deposit_address.clone(),
                amount: approvable.checked_sub(approved)?,
            });
        }
    }

    Ok(payouts)
}

/// Principal and tax payouts for submitted withdrawals, paired index by
/// index. Burns below the flat fee are skipped; they can never be paid out.
pub fn compute_withdrawal_payouts(
    pending: &[(Withdrawal, BurnRecord)],
    fees: &FeeSchedule,
) -> Result<(Vec<WithdrawalPayout>, Vec<WithdrawalTaxPayout>), PayoutError> {
    let mut payouts = Vec::new();
    let mut tax_payouts = Vec::new();

    for (withdrawal, burn) in pending {
        if !fees.meets_tax(burn.burn_amount) {
            continue;
        }

        payouts.push(WithdrawalPayout {
            burn_address: withdrawal.burn_address.clone(),
            burn_index: withdrawal.burn_index,
            burn_destination: burn.burn_destination.clone(),
            amount: fees.amount_after_tax(burn.burn_amount)?,
        });
        tax_payouts.push(WithdrawalTaxPayout {
            burn_address: withdrawal.burn_address.clone(),
            burn_index: withdrawal.burn_index,
            burn_destination: burn.burn_destination.clone(),
            amount: fees.tax(burn.burn_amount)?,
        });
    }

    Ok((payouts, tax_payouts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wdingo_primitives::amount::COIN;

    fn binding(deposit: &str, approved_tax: u64) -> MintBinding {
        let mut b = MintBinding::new(
            format!("0xmint-{deposit}"),
            deposit.to_owned(),
            "52ae".to_owned(),
        );
        b.approved_tax = Sats::from_sat(approved_tax);
        b
    }

    #[test]
    fn owes_the_difference_to_the_approvable_ceiling() {
        let fees = FeeSchedule::default();
        let bindings = vec![binding("Dd1", 0), binding("Dd2", 1_040_000_000)];
        let received: BTreeMap<String, Sats> = [
            ("Dd1".to_owned(), Sats::from_sat(50 * COIN)),
            ("Dd2".to_owned(), Sats::from_sat(50 * COIN)),
        ]
        .into();

        let payouts = compute_deposit_tax_payouts(&bindings, &received, &fees).unwrap();
        // Dd2 is fully settled already; only Dd1 owes its 10.4 coins of tax.
        assert_eq!(
            payouts,
            vec![DepositTaxPayout {
                deposit_address: "Dd1".to_owned(),
                amount: Sats::from_sat(1_040_000_000),
            }]
        );
    }

    #[test]
    fn skips_untaxable_and_unknown_balances() {
        let fees = FeeSchedule::default();
        let bindings = vec![binding("Dsmall", 0), binding("Dempty", 0)];
        let received: BTreeMap<String, Sats> =
            [("Dsmall".to_owned(), Sats::from_sat(9 * COIN))].into();

        let payouts = compute_deposit_tax_payouts(&bindings, &received, &fees).unwrap();
        assert!(payouts.is_empty());
    }

    #[test]
    fn regressed_balance_is_fatal() {
        let fees = FeeSchedule::default();
        // Approved more than the tax on the currently confirmed balance.
        let bindings = vec![binding("Dd1", 2_000_000_000)];
        let received: BTreeMap<String, Sats> =
            [("Dd1".to_owned(), Sats::from_sat(50 * COIN))].into();

        assert!(matches!(
            compute_deposit_tax_payouts(&bindings, &received, &fees),
            Err(PayoutError::AccountingInvariantViolated { .. })
        ));
    }

    #[test]
    fn withdrawal_payouts_pair_up() {
        let fees = FeeSchedule::default();
        let pending = vec![
            (
                Withdrawal::submitted("0xa".to_owned(), 3),
                BurnRecord {
                    burn_destination: "Ddest1".to_owned(),
                    burn_amount: Sats::from_sat(80 * COIN),
                },
            ),
            // Below the flat fee: never payable.
            (
                Withdrawal::submitted("0xb".to_owned(), 0),
                BurnRecord {
                    burn_destination: "Ddest2".to_owned(),
                    burn_amount: Sats::from_sat(5 * COIN),
                },
            ),
        ];

        let (payouts, tax_payouts) = compute_withdrawal_payouts(&pending, &fees).unwrap();
        assert_eq!(payouts.len(), 1);
        assert_eq!(tax_payouts.len(), 1);
        assert_eq!(payouts[0].amount, Sats::from_sat(6_930_000_000));
        assert_eq!(tax_payouts[0].amount, Sats::from_sat(1_070_000_000));
        assert_eq!(payouts[0].burn_index, 3);
        assert_eq!(tax_payouts[0].burn_address, "0xa");
    }
}
