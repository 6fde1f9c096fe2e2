//! Store abstraction for the authority node's durable state.
//!
//! The store owns exactly three tables: used deposit pubkeys, mint
//! bindings, and withdrawals. Mutations happen under the node's global
//! write lock; the trait itself only guarantees per-call atomicity.

pub mod dump;
pub mod errors;
pub mod traits;
pub mod types;

pub use dump::DatabaseDump;
pub use errors::DbError;
pub use traits::BridgeStore;
pub use types::{MintBinding, Withdrawal};

pub type DbResult<T> = Result<T, errors::DbError>;
