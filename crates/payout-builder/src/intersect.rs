//! Consensus intersection of per-authority replies.
//!
//! The coordinator keeps only the records every authority reported. This
//! elects the largest batch all of them can validate and sign; an authority
//! with a lagging chain view simply shrinks the round instead of failing
//! it.

use wdingo_primitives::PayoutBatch;

use crate::errors::PayoutError;

/// Records of the first list that appear (structurally equal) in every
/// other list, in the first list's order.
pub fn intersect_lists<T: PartialEq + Clone>(lists: &[Vec<T>]) -> Vec<T> {
    let Some((first, rest)) = lists.split_first() else {
        return Vec::new();
    };
    first
        .iter()
        .filter(|item| rest.iter().all(|list| list.contains(item)))
        .cloned()
        .collect()
}

/// Element-wise intersection of payout batches.
///
/// After intersecting the three lists independently, withdrawal payouts and
/// their tax payouts are re-paired: a withdrawal survives only if both
/// halves survived on every authority.
pub fn intersect_batches(batches: &[PayoutBatch]) -> Result<PayoutBatch, PayoutError> {
    let deposit_tax_payouts = intersect_lists(
        &batches
            .iter()
            .map(|b| b.deposit_tax_payouts.clone())
            .collect::<Vec<_>>(),
    );
    let mut withdrawal_payouts = intersect_lists(
        &batches
            .iter()
            .map(|b| b.withdrawal_payouts.clone())
            .collect::<Vec<_>>(),
    );
    let mut withdrawal_tax_payouts = intersect_lists(
        &batches
            .iter()
            .map(|b| b.withdrawal_tax_payouts.clone())
            .collect::<Vec<_>>(),
    );

    let payout_keys: Vec<(String, u64)> = withdrawal_payouts
        .iter()
        .map(|p| (p.burn_address.clone(), p.burn_index))
        .collect();
    let tax_keys: Vec<(String, u64)> = withdrawal_tax_payouts
        .iter()
        .map(|p| (p.burn_address.clone(), p.burn_index))
        .collect();

    withdrawal_payouts.retain(|p| tax_keys.contains(&(p.burn_address.clone(), p.burn_index)));
    withdrawal_tax_payouts
        .retain(|p| payout_keys.contains(&(p.burn_address.clone(), p.burn_index)));

    if withdrawal_payouts.len() != withdrawal_tax_payouts.len() {
        return Err(PayoutError::UnpairedWithdrawalPayouts);
    }

    Ok(PayoutBatch {
        deposit_tax_payouts,
        withdrawal_payouts,
        withdrawal_tax_payouts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wdingo_primitives::{
        DepositTaxPayout, Sats, UnspentOutput, WithdrawalPayout, WithdrawalTaxPayout,
    };

    fn dep(address: &str, amount: u64) -> DepositTaxPayout {
        DepositTaxPayout {
            deposit_address: address.to_owned(),
            amount: Sats::from_sat(amount),
        }
    }

    fn wp(index: u64) -> WithdrawalPayout {
        WithdrawalPayout {
            burn_address: "0xb".to_owned(),
            burn_index: index,
            burn_destination: "Ddest".to_owned(),
            amount: Sats::from_sat(6_930_000_000),
        }
    }

    fn wtp(index: u64) -> WithdrawalTaxPayout {
        WithdrawalTaxPayout {
            burn_address: "0xb".to_owned(),
            burn_index: index,
            burn_destination: "Ddest".to_owned(),
            amount: Sats::from_sat(1_070_000_000),
        }
    }

    #[test]
    fn keeps_only_records_every_authority_reported() {
        let a = vec![dep("D1", 5), dep("D2", 7), dep("D3", 9)];
        let b = vec![dep("D3", 9), dep("D1", 5)];
        let c = vec![dep("D1", 5), dep("D3", 9), dep("D4", 1)];

        let merged = intersect_lists(&[a, b, c]);
        assert_eq!(merged, vec![dep("D1", 5), dep("D3", 9)]);
    }

    #[test]
    fn amount_disagreement_drops_the_record() {
        let a = vec![dep("D1", 5)];
        let b = vec![dep("D1", 6)];
        assert!(intersect_lists(&[a, b]).is_empty());
    }

    #[test]
    fn unspent_intersection_matches_on_txid_vout_amount() {
        let u = |txid: &str, amount: u64| UnspentOutput {
            txid: txid.to_owned(),
            vout: 0,
            address: "Dd".to_owned(),
            amount: Sats::from_sat(amount),
        };
        let a = vec![u("t1", 10), u("t2", 20)];
        let b = vec![u("t2", 20), u("t1", 11)];
        assert_eq!(intersect_lists(&[a, b]), vec![u("t2", 20)]);
    }

    #[test]
    fn batches_survive_only_fully_paired() {
        let full = PayoutBatch {
            deposit_tax_payouts: vec![],
            withdrawal_payouts: vec![wp(0), wp(1)],
            withdrawal_tax_payouts: vec![wtp(0), wtp(1)],
        };
        // The second authority never saw burn index 1's tax payout.
        let partial = PayoutBatch {
            deposit_tax_payouts: vec![],
            withdrawal_payouts: vec![wp(0), wp(1)],
            withdrawal_tax_payouts: vec![wtp(0)],
        };

        let merged = intersect_batches(&[full, partial]).unwrap();
        assert_eq!(merged.withdrawal_payouts, vec![wp(0)]);
        assert_eq!(merged.withdrawal_tax_payouts, vec![wtp(0)]);
    }
}
