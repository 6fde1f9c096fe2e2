//! Request and response payload types.
//!
//! Field names are the wire format; responses listed here are the `data`
//! payloads that get sealed into envelopes by the node.

use serde::{Deserialize, Serialize};
use wdingo_envelope::Envelope;
use wdingo_evmio::OnContractVerification;
use wdingo_primitives::{
    DepositTaxPayout, PayoutBatch, Sats, UnspentOutput, WithdrawalPayout, WithdrawalTaxPayout,
};

/// Empty JSON object payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResponse {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDepositAddressRequest {
    pub mint_address: String,
}

/// Phase-1 payload: `deposit_address` carries this authority's fresh raw
/// pubkey, not yet a multisig address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDepositAddressResponse {
    pub mint_address: String,
    pub deposit_address: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMintDepositAddressRequest {
    /// One phase-1 envelope per authority, in configured authority order.
    pub generate_deposit_address_responses: Vec<Envelope>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMintDepositAddressResponse {
    pub deposit_address: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMintBalanceRequest {
    pub mint_address: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMintBalanceResponse {
    pub mint_nonce: u64,
    pub mint_address: String,
    pub deposit_address: String,
    /// Mintable confirmed balance, after tax.
    pub deposited_amount: Sats,
    /// Mintable unconfirmed balance, after tax.
    pub unconfirmed_amount: Sats,
    pub minted_amount: Sats,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMintTransactionRequest {
    pub mint_address: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMintTransactionResponse {
    pub mint_address: String,
    pub mint_nonce: u64,
    pub deposit_address: String,
    pub mint_amount: Sats,
    pub on_contract_verification: OnContractVerification,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBurnHistoryRequest {
    pub burn_address: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    Submitted,
    Approved,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnHistoryEntry {
    pub burn_destination: String,
    pub burn_amount: Sats,
    /// `None` when this authority has no record of the burn being submitted
    /// for withdrawal.
    pub status: Option<WithdrawalStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBurnHistoryResponse {
    pub burn_history: Vec<BurnHistoryEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitWithdrawalRequest {
    pub burn_address: String,
    pub burn_index: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputePendingPayoutsRequest {
    pub process_deposits: bool,
    pub process_withdrawals: bool,
}

/// Reply payload of `computePendingPayouts`: the three pending lists.
pub type ComputePendingPayoutsResponse = PayoutBatch;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeUnspentResponse {
    pub unspent: Vec<UnspentOutput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogResponse {
    pub log: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DumpDatabaseResponse {
    pub sql: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePayoutsRequest {
    pub deposit_tax_payouts: Vec<DepositTaxPayout>,
    pub withdrawal_payouts: Vec<WithdrawalPayout>,
    pub withdrawal_tax_payouts: Vec<WithdrawalTaxPayout>,
    /// The exact UTXO set the settlement transaction spends.
    pub unspent: Vec<UnspentOutput>,
    /// The partially signed raw transaction accumulated so far.
    pub approval_chain: String,
}

impl ApprovePayoutsRequest {
    pub fn batch(&self) -> PayoutBatch {
        PayoutBatch {
            deposit_tax_payouts: self.deposit_tax_payouts.clone(),
            withdrawal_payouts: self.withdrawal_payouts.clone(),
            withdrawal_tax_payouts: self.withdrawal_tax_payouts.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePayoutsResponse {
    pub approval_chain: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutePayoutsRequest {
    pub process_deposits: bool,
    pub process_withdrawals: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutePayoutsResponse {
    pub deposit_tax_payouts: usize,
    pub withdrawal_payouts: usize,
    /// Txid of the broadcast settlement transaction; absent when the round
    /// found nothing to settle.
    pub txid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withdrawal_status_uses_wire_spelling() {
        assert_eq!(
            serde_json::to_string(&WithdrawalStatus::Submitted).unwrap(),
            "\"SUBMITTED\""
        );
        assert_eq!(
            serde_json::to_string(&WithdrawalStatus::Approved).unwrap(),
            "\"APPROVED\""
        );
    }

    #[test]
    fn approve_request_round_trips() {
        let req = ApprovePayoutsRequest {
            deposit_tax_payouts: vec![],
            withdrawal_payouts: vec![],
            withdrawal_tax_payouts: vec![],
            unspent: vec![],
            approval_chain: "0200...".to_owned(),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("approvalChain").is_some());
        assert!(v.get("depositTaxPayouts").is_some());
        let back: ApprovePayoutsRequest = serde_json::from_value(v).unwrap();
        assert_eq!(back, req);
    }
}
