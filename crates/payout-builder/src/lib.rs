//! Construction and validation of settlement batches.
//!
//! Everything here is a pure function of store state, chain state, and the
//! fee schedule. Authorities run the same functions over the same inputs
//! and must agree byte-for-byte on the resulting vouts before any of them
//! signs.

pub mod errors;
pub mod intersect;
pub mod pending;
pub mod validate;
pub mod vouts;

pub use errors::PayoutError;
pub use intersect::{intersect_batches, intersect_lists};
pub use pending::{compute_deposit_tax_payouts, compute_withdrawal_payouts};
pub use validate::{validate_batch, BatchContext};
pub use vouts::build_vouts;
