//! Textual database snapshots for operator dump/restore.

use serde::{Deserialize, Serialize};

use crate::types::{MintBinding, Withdrawal};
use crate::{DbError, DbResult};

/// The full contents of an authority's store.
///
/// Divergence between authorities is repaired by dumping a healthy node and
/// resetting the diverged one, so this must stay self-contained and stable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseDump {
    pub used_deposit_pubkeys: Vec<String>,
    pub mint_bindings: Vec<MintBinding>,
    pub withdrawals: Vec<Withdrawal>,
}

impl DatabaseDump {
    pub fn to_text(&self) -> DbResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DbError::BadDump(e.to_string()))
    }

    pub fn from_text(text: &str) -> DbResult<Self> {
        serde_json::from_str(text).map_err(|e| DbError::BadDump(e.to_string()))
    }
}
