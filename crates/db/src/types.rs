//! Store entities.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use wdingo_primitives::Sats;

/// One-to-one mapping between a token-chain mint address and its multisig
/// deposit address.
///
/// `approved_tax` is the cumulative deposit tax this authority has already
/// co-signed a payout for; it only ever increases, and never past the tax
/// owed on the confirmed balance of `deposit_address`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintBinding {
    pub mint_address: String,
    pub deposit_address: String,
    /// Sufficient for the daemon to co-sign spends from `deposit_address`.
    pub redeem_script: String,
    pub approved_tax: Sats,
}

impl MintBinding {
    pub fn new(mint_address: String, deposit_address: String, redeem_script: String) -> Self {
        Self {
            mint_address,
            deposit_address,
            redeem_script,
            approved_tax: Sats::ZERO,
        }
    }
}

/// This authority's record of one user-reported burn event.
///
/// A withdrawal is either SUBMITTED (both approved fields zero) or APPROVED
/// (principal and tax fully credited). There is no partial approval.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub burn_address: String,
    pub burn_index: u64,
    pub approved_amount: Sats,
    pub approved_tax: Sats,
}

impl Withdrawal {
    pub fn submitted(burn_address: String, burn_index: u64) -> Self {
        Self {
            burn_address,
            burn_index,
            approved_amount: Sats::ZERO,
            approved_tax: Sats::ZERO,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.approved_amount.is_zero() && self.approved_tax.is_zero()
    }
}
