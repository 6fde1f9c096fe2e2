use std::collections::BTreeSet;

use crate::types::{MintBinding, Withdrawal};
use crate::DbResult;

/// The durable state of one authority.
///
/// Each call is atomic on its own. Serialization of read-validate-mutate
/// sequences is the caller's job (the node holds a process-wide write lock
/// around them).
pub trait BridgeStore: Send + Sync + 'static {
    /// Whether any of `pubkeys` has ever been used in a registration.
    fn has_used_deposit_pubkeys(&self, pubkeys: &[String]) -> DbResult<bool>;

    /// Marks all `pubkeys` used. Fails without writing anything if any of
    /// them is already present.
    fn register_used_deposit_pubkeys(&self, pubkeys: &[String]) -> DbResult<()>;

    /// Fails if the mint address or the deposit address is already bound.
    fn register_mint_binding(&self, binding: MintBinding) -> DbResult<()>;

    fn get_mint_binding(&self, mint_address: &str) -> DbResult<Option<MintBinding>>;

    fn get_mint_binding_by_deposit_address(
        &self,
        deposit_address: &str,
    ) -> DbResult<Option<MintBinding>>;

    /// All bindings, or only those whose deposit address is in `filter`.
    fn get_mint_bindings(&self, filter: Option<&BTreeSet<String>>) -> DbResult<Vec<MintBinding>>;

    /// Overwrites `approved_tax` of each named binding. Nothing else of the
    /// binding is touched.
    fn update_mint_bindings(&self, bindings: &[MintBinding]) -> DbResult<()>;

    /// Fails on duplicate `(burn_address, burn_index)`.
    fn register_withdrawal(&self, burn_address: &str, burn_index: u64) -> DbResult<()>;

    fn get_withdrawal(&self, burn_address: &str, burn_index: u64)
        -> DbResult<Option<Withdrawal>>;

    fn get_withdrawals(&self) -> DbResult<Vec<Withdrawal>>;

    fn get_unapproved_withdrawals(&self) -> DbResult<Vec<Withdrawal>>;

    /// Overwrites `approved_amount`/`approved_tax` of each named withdrawal.
    fn update_withdrawals(&self, withdrawals: &[Withdrawal]) -> DbResult<()>;

    /// Complete, self-contained textual snapshot, suitable for restoring a
    /// diverged peer.
    fn dump(&self) -> DbResult<String>;

    /// Atomically replaces all local state with `dump`.
    fn reset(&self, dump: &str) -> DbResult<()>;
}
