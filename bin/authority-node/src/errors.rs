//! Node-level error classification and RPC error mapping.

use jsonrpsee::types::ErrorObjectOwned;
use thiserror::Error;
use wdingo_db::DbError;
use wdingo_dingoio::ClientError;
use wdingo_envelope::EnvelopeError;
use wdingo_evmio::EvmClientError;
use wdingo_payout_builder::PayoutError;
use wdingo_primitives::AmountError;

pub type AppResult<T> = Result<T, AppError>;

/// The error kinds surfaced to callers, each with a stable code.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("consensus failure: {0}")]
    Consensus(String),

    #[error("chain view unavailable: {0}")]
    ChainView(String),

    #[error("amount too small: {0}")]
    AmountTooSmall(String),

    #[error("accounting invariant violated: {0}")]
    AccountingInvariantViolated(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("insufficient tax for network fee: {0}")]
    InsufficientTaxForFee(String),

    #[error("transaction shape mismatch: {0}")]
    TxShapeMismatch(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> i32 {
        match self {
            AppError::Internal(_) => 1000,
            AppError::MalformedRequest(_) => 1001,
            AppError::Unauthorized(_) => 1003,
            AppError::Duplicate(_) => 1004,
            AppError::Consensus(_) => 1005,
            AppError::ChainView(_) => 1006,
            AppError::AmountTooSmall(_) => 1007,
            AppError::AccountingInvariantViolated(_) => 1008,
            AppError::InsufficientFunds(_) => 1009,
            AppError::InsufficientTaxForFee(_) => 1010,
            AppError::TxShapeMismatch(_) => 1011,
        }
    }

    /// Whether this failure should land in the persistent error log.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Internal(_) | AppError::AccountingInvariantViolated(_)
        )
    }
}

impl From<AppError> for ErrorObjectOwned {
    fn from(err: AppError) -> Self {
        ErrorObjectOwned::owned(err.code(), err.to_string(), None::<()>)
    }
}

impl From<ClientError> for AppError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::TxShapeMismatch(detail) => AppError::TxShapeMismatch(detail),
            other => AppError::ChainView(other.to_string()),
        }
    }
}

impl From<EvmClientError> for AppError {
    fn from(err: EvmClientError) -> Self {
        match err {
            EvmClientError::UnknownBurn(..) | EvmClientError::InvalidAddress(_) => {
                AppError::MalformedRequest(err.to_string())
            }
            EvmClientError::InvalidSignature(_) => AppError::Unauthorized(err.to_string()),
            EvmClientError::Contract(_) | EvmClientError::InvalidProviderUrl(_) => {
                AppError::ChainView(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<EnvelopeError> for AppError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::NotAnObject | EnvelopeError::Payload(_) => {
                AppError::MalformedRequest(err.to_string())
            }
            EnvelopeError::Signing(detail) => AppError::Internal(detail),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DepositPubkeyUsed(_)
            | DbError::MintAddressBound(_)
            | DbError::DepositAddressBound(_)
            | DbError::WithdrawalExists(..) => AppError::Duplicate(err.to_string()),
            DbError::BadDump(_) => AppError::MalformedRequest(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<PayoutError> for AppError {
    fn from(err: PayoutError) -> Self {
        match err {
            PayoutError::AccountingInvariantViolated { .. } => {
                AppError::AccountingInvariantViolated(err.to_string())
            }
            PayoutError::InsufficientTaxForFee { .. } => {
                AppError::InsufficientTaxForFee(err.to_string())
            }
            PayoutError::InsufficientFunds { .. } => AppError::InsufficientFunds(err.to_string()),
            PayoutError::NoTaxAddresses => AppError::Internal(err.to_string()),
            PayoutError::Amount(amount) => amount.into(),
            other => AppError::Consensus(other.to_string()),
        }
    }
}

impl From<AmountError> for AppError {
    fn from(err: AmountError) -> Self {
        match err {
            AmountError::AmountTooSmall(..) => AppError::AmountTooSmall(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use wdingo_primitives::Sats;

    use super::*;

    #[test]
    fn payout_errors_map_to_the_right_kinds() {
        // A replayed approval against an already-approved withdrawal is a
        // consensus failure, not a duplicate.
        let err: AppError = PayoutError::WithdrawalAlreadyApproved("0xb".into(), 3).into();
        assert!(matches!(err, AppError::Consensus(_)));

        let err: AppError = PayoutError::AccountingInvariantViolated {
            deposit_address: "Dd".into(),
            approvable: Sats::from_sat(1),
            approved: Sats::from_sat(2),
        }
        .into();
        assert!(err.is_fatal());
        assert_eq!(err.code(), 1008);

        let err: AppError = PayoutError::InsufficientTaxForFee {
            total_tax: Sats::ZERO,
            network_fee: Sats::from_sat(1),
        }
        .into();
        assert!(matches!(err, AppError::InsufficientTaxForFee(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn envelope_errors_are_unauthorized() {
        let err: AppError = EnvelopeError::Expired {
            height: 10,
            current: 100,
        }
        .into();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(err.code(), 1003);
    }

    #[test]
    fn store_uniqueness_violations_are_duplicates() {
        let err: AppError = DbError::WithdrawalExists("0xb".into(), 7).into();
        assert!(matches!(err, AppError::Duplicate(_)));

        let err: AppError = DbError::DepositPubkeyUsed("02aa".into()).into();
        assert!(matches!(err, AppError::Duplicate(_)));
    }
}
