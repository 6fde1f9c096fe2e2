//! Shared primitive types for the wDingo authority node.
//!
//! Everything consensus-critical bottoms out here: fixed-point amounts, the
//! tax/fee formulas, and the payout record types that every authority must
//! compute byte-identically from the same chain state.

pub mod amount;
pub mod fees;
pub mod payout;

pub use amount::{AmountError, Sats};
pub use fees::FeeSchedule;
pub use payout::{
    BurnRecord, DepositTaxPayout, PayoutBatch, UnspentOutput, WithdrawalPayout,
    WithdrawalTaxPayout,
};
