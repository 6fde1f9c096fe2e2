//! Records exchanged between authorities while assembling a payout batch.
//!
//! These types cross the wire verbatim; field names match the inter-node
//! JSON format. Equality is structural, which is what the coordinator's
//! consensus intersection relies on.

use serde::{Deserialize, Serialize};

use crate::amount::Sats;

/// Pending deposit-tax disbursement for one bound deposit address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositTaxPayout {
    pub deposit_address: String,
    pub amount: Sats,
}

/// Pending principal disbursement for one submitted withdrawal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalPayout {
    pub burn_address: String,
    pub burn_index: u64,
    pub burn_destination: String,
    pub amount: Sats,
}

/// Pending tax disbursement paired 1:1 with a [`WithdrawalPayout`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalTaxPayout {
    pub burn_address: String,
    pub burn_index: u64,
    pub burn_destination: String,
    pub amount: Sats,
}

/// One confirmed UTXO at the change address or a deposit address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnspentOutput {
    pub txid: String,
    pub vout: u32,
    pub address: String,
    pub amount: Sats,
}

/// An immutable on-chain burn event as read from the token contract.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnRecord {
    pub burn_destination: String,
    pub burn_amount: Sats,
}

/// The three payout lists settled by one on-chain transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutBatch {
    pub deposit_tax_payouts: Vec<DepositTaxPayout>,
    pub withdrawal_payouts: Vec<WithdrawalPayout>,
    pub withdrawal_tax_payouts: Vec<WithdrawalTaxPayout>,
}

impl PayoutBatch {
    pub fn is_empty(&self) -> bool {
        self.deposit_tax_payouts.is_empty()
            && self.withdrawal_payouts.is_empty()
            && self.withdrawal_tax_payouts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names_are_camel_case() {
        let p = WithdrawalPayout {
            burn_address: "0xabc".into(),
            burn_index: 3,
            burn_destination: "DDogepartyxxxxxxxxxxxxxxxxxxw1dfzr".into(),
            amount: Sats::from_sat(6_930_000_000),
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["burnAddress"], "0xabc");
        assert_eq!(v["burnIndex"], 3);
        assert_eq!(v["amount"], "6930000000");
    }
}
