use thiserror::Error;
use wdingo_primitives::{AmountError, Sats};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayoutError {
    /// Stored approved tax has run past what the chain can justify. Fatal;
    /// operators repair by dump/restore from a healthy authority.
    #[error(
        "approved tax {approved} exceeds approvable {approvable} for deposit {deposit_address}"
    )]
    AccountingInvariantViolated {
        deposit_address: String,
        approvable: Sats,
        approved: Sats,
    },

    #[error("total tax {total_tax} cannot cover the network fee {network_fee}")]
    InsufficientTaxForFee { total_tax: Sats, network_fee: Sats },

    #[error("unspent total {available} cannot cover payouts and network fee")]
    InsufficientFunds { available: Sats },

    #[error("deposit address {0} is not bound")]
    UnknownDepositAddress(String),

    #[error("deposit address {0} has no taxable confirmed balance")]
    DepositBelowTaxThreshold(String),

    #[error("deposit tax payout for {0} exceeds the approvable remainder")]
    DepositTaxOvershoot(String),

    #[error("withdrawal payout list and tax payout list do not pair up")]
    UnpairedWithdrawalPayouts,

    #[error("withdrawal payout {0} and its tax payout disagree")]
    MismatchedWithdrawalPair(usize),

    #[error("no withdrawal ({0}, {1})")]
    WithdrawalNotFound(String, u64),

    #[error("withdrawal ({0}, {1}) is already approved")]
    WithdrawalAlreadyApproved(String, u64),

    #[error("withdrawal ({0}, {1}) does not match the on-chain burn")]
    BurnMismatch(String, u64),

    #[error("no tax payout addresses configured")]
    NoTaxAddresses,

    #[error(transparent)]
    Amount(#[from] AmountError),
}
