//! RocksDB-backed implementation of the authority store.

pub mod db;
pub mod macros;
pub mod schemas;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rockbound::schema::ColumnFamilyName;
use rockbound::{rocksdb, OptimisticTransactionDB, Schema};

pub use db::BridgeDb;

use crate::schemas::{
    DepositAddressIndexSchema, MintBindingSchema, UsedDepositPubkeySchema, WithdrawalSchema,
};

pub const ROCKSDB_NAME: &str = "wdingo";

pub const STORE_COLUMN_FAMILIES: &[ColumnFamilyName] = &[
    UsedDepositPubkeySchema::COLUMN_FAMILY_NAME,
    MintBindingSchema::COLUMN_FAMILY_NAME,
    DepositAddressIndexSchema::COLUMN_FAMILY_NAME,
    WithdrawalSchema::COLUMN_FAMILY_NAME,
];

/// Opens (or creates) the node database under `database_dir`.
pub fn open_rocksdb_database(database_dir: &Path) -> anyhow::Result<Arc<OptimisticTransactionDB>> {
    if !database_dir.exists() {
        fs::create_dir_all(database_dir)?;
    }

    let mut opts = rocksdb::Options::default();
    opts.create_if_missing(true);
    opts.create_missing_column_families(true);

    let rbdb = OptimisticTransactionDB::open(
        database_dir,
        ROCKSDB_NAME,
        STORE_COLUMN_FAMILIES.iter().map(|s| s.to_string()),
        &opts,
    )?;

    Ok(Arc::new(rbdb))
}
