//! Shape verification of settlement transactions.
//!
//! Every authority recomputes the payout vouts independently and refuses to
//! sign a raw transaction that deviates from them in any way; this is the
//! pure half of that check, applied to an already-decoded transaction.

use std::collections::{BTreeMap, BTreeSet};

use wdingo_primitives::{Sats, UnspentOutput};

use crate::error::{ClientError, ClientResult};
use crate::types::{sats_from_coin, DecodedTransaction};

/// Checks that `decoded` spends exactly `unspent` (matched by `(txid,
/// vout)`) and pays exactly the `expected` address/amount pairs, one vout
/// per address.
pub fn check_transaction_shape(
    decoded: &DecodedTransaction,
    unspent: &[UnspentOutput],
    expected: &BTreeMap<String, Sats>,
) -> ClientResult<()> {
    let mismatch = |detail: String| Err(ClientError::TxShapeMismatch(detail));

    // Inputs: exact set equality on (txid, vout).
    let tx_inputs: BTreeSet<(&str, u32)> = decoded
        .vin
        .iter()
        .map(|v| (v.txid.as_str(), v.vout))
        .collect();
    let expected_inputs: BTreeSet<(&str, u32)> =
        unspent.iter().map(|u| (u.txid.as_str(), u.vout)).collect();

    if decoded.vin.len() != unspent.len() || tx_inputs != expected_inputs {
        return mismatch(format!(
            "inputs differ: transaction spends {} outpoints, expected {}",
            decoded.vin.len(),
            unspent.len()
        ));
    }

    // Outputs: one vout per expected address, exact amounts.
    if decoded.vout.len() != expected.len() {
        return mismatch(format!(
            "vout count {} != expected {}",
            decoded.vout.len(),
            expected.len()
        ));
    }

    let mut seen = BTreeSet::new();
    for vout in &decoded.vout {
        let [address] = vout.script_pub_key.addresses.as_slice() else {
            return mismatch(format!("vout {} does not pay a single address", vout.n));
        };
        let amount = sats_from_coin(vout.value)?;

        match expected.get(address) {
            None => return mismatch(format!("unexpected vout to {address}")),
            Some(want) if *want != amount => {
                return mismatch(format!(
                    "vout to {address} pays {amount}, expected {want}"
                ));
            }
            Some(_) => {}
        }
        if !seen.insert(address.clone()) {
            return mismatch(format!("duplicate vout to {address}"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DecodedScriptPubKey, DecodedVin, DecodedVout};

    fn utxo(txid: &str, vout: u32, amount: u64) -> UnspentOutput {
        UnspentOutput {
            txid: txid.to_owned(),
            vout,
            address: "DChangeXXXXXXXXXXXXXXXXXXXXXXXXXXX".to_owned(),
            amount: Sats::from_sat(amount),
        }
    }

    fn decoded(
        vins: &[(&str, u32)],
        vouts: &[(&str, f64)],
    ) -> DecodedTransaction {
        DecodedTransaction {
            txid: "feed".to_owned(),
            vin: vins
                .iter()
                .map(|(txid, vout)| DecodedVin {
                    txid: (*txid).to_owned(),
                    vout: *vout,
                })
                .collect(),
            vout: vouts
                .iter()
                .enumerate()
                .map(|(n, (addr, value))| DecodedVout {
                    value: *value,
                    n: n as u32,
                    script_pub_key: DecodedScriptPubKey {
                        addresses: vec![(*addr).to_owned()],
                    },
                })
                .collect(),
        }
    }

    fn expected(pairs: &[(&str, u64)]) -> BTreeMap<String, Sats> {
        pairs
            .iter()
            .map(|(a, sat)| ((*a).to_owned(), Sats::from_sat(*sat)))
            .collect()
    }

    #[test]
    fn accepts_matching_transaction() {
        let unspent = vec![utxo("aa", 0, 5_000_000_000), utxo("bb", 1, 1_000_000_000)];
        let vouts = expected(&[("Ddest", 3_000_000_000), ("Dchange", 2_500_000_000)]);
        let tx = decoded(&[("bb", 1), ("aa", 0)], &[("Ddest", 30.0), ("Dchange", 25.0)]);
        assert!(check_transaction_shape(&tx, &unspent, &vouts).is_ok());
    }

    #[test]
    fn rejects_missing_input() {
        let unspent = vec![utxo("aa", 0, 1), utxo("bb", 1, 1)];
        let vouts = expected(&[("Ddest", 1)]);
        let tx = decoded(&[("aa", 0)], &[("Ddest", 0.000_000_01)]);
        assert!(matches!(
            check_transaction_shape(&tx, &unspent, &vouts),
            Err(ClientError::TxShapeMismatch(_))
        ));
    }

    #[test]
    fn rejects_foreign_input() {
        let unspent = vec![utxo("aa", 0, 1)];
        let vouts = expected(&[("Ddest", 1)]);
        let tx = decoded(&[("cc", 7)], &[("Ddest", 0.000_000_01)]);
        assert!(check_transaction_shape(&tx, &unspent, &vouts).is_err());
    }

    #[test]
    fn rejects_amount_mismatch() {
        let unspent = vec![utxo("aa", 0, 5_000_000_000)];
        let vouts = expected(&[("Ddest", 3_000_000_000)]);
        let tx = decoded(&[("aa", 0)], &[("Ddest", 30.000_000_01)]);
        assert!(check_transaction_shape(&tx, &unspent, &vouts).is_err());
    }

    #[test]
    fn rejects_extra_vout() {
        let unspent = vec![utxo("aa", 0, 5_000_000_000)];
        let vouts = expected(&[("Ddest", 3_000_000_000)]);
        let tx = decoded(
            &[("aa", 0)],
            &[("Ddest", 30.0), ("Dsneaky", 19.0)],
        );
        assert!(check_transaction_shape(&tx, &unspent, &vouts).is_err());
    }

    #[test]
    fn rejects_unexpected_destination() {
        let unspent = vec![utxo("aa", 0, 5_000_000_000)];
        let vouts = expected(&[("Ddest", 3_000_000_000)]);
        let tx = decoded(&[("aa", 0)], &[("Dother", 30.0)]);
        assert!(check_transaction_shape(&tx, &unspent, &vouts).is_err());
    }
}
