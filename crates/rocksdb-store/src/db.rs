use std::collections::BTreeSet;
use std::sync::Arc;

use rockbound::{OptimisticTransactionDB, SchemaBatch, SchemaDBOperations, SchemaDBOperationsExt};
use wdingo_db::{BridgeStore, DatabaseDump, DbError, DbResult, MintBinding, Withdrawal};

use crate::schemas::{
    DepositAddressIndexSchema, MintBindingSchema, UsedDepositPubkeySchema, WithdrawalSchema,
};

pub struct BridgeDb {
    db: Arc<OptimisticTransactionDB>,
}

impl BridgeDb {
    /// `db` is expected to be opened with all column families in
    /// [`STORE_COLUMN_FAMILIES`](crate::STORE_COLUMN_FAMILIES).
    pub fn new(db: Arc<OptimisticTransactionDB>) -> Self {
        Self { db }
    }

    fn all_bindings(&self) -> DbResult<Vec<MintBinding>> {
        let mut bindings = Vec::new();
        for item in self.db.iter::<MintBindingSchema>()? {
            let (_, binding) = item?.into_tuple();
            bindings.push(binding);
        }
        Ok(bindings)
    }

    fn all_used_pubkeys(&self) -> DbResult<Vec<String>> {
        let mut pubkeys = Vec::new();
        for item in self.db.iter::<UsedDepositPubkeySchema>()? {
            let (pubkey, ()) = item?.into_tuple();
            pubkeys.push(pubkey);
        }
        Ok(pubkeys)
    }
}

impl BridgeStore for BridgeDb {
    fn has_used_deposit_pubkeys(&self, pubkeys: &[String]) -> DbResult<bool> {
        for pubkey in pubkeys {
            if self.db.get::<UsedDepositPubkeySchema>(pubkey)?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn register_used_deposit_pubkeys(&self, pubkeys: &[String]) -> DbResult<()> {
        let mut batch = SchemaBatch::new();
        for pubkey in pubkeys {
            if self.db.get::<UsedDepositPubkeySchema>(pubkey)?.is_some() {
                return Err(DbError::DepositPubkeyUsed(pubkey.clone()));
            }
            batch.put::<UsedDepositPubkeySchema>(pubkey, &())?;
        }
        self.db.write_schemas(batch)?;
        Ok(())
    }

    fn register_mint_binding(&self, binding: MintBinding) -> DbResult<()> {
        if self
            .db
            .get::<MintBindingSchema>(&binding.mint_address)?
            .is_some()
        {
            return Err(DbError::MintAddressBound(binding.mint_address));
        }
        if self
            .db
            .get::<DepositAddressIndexSchema>(&binding.deposit_address)?
            .is_some()
        {
            return Err(DbError::DepositAddressBound(binding.deposit_address));
        }

        let mut batch = SchemaBatch::new();
        batch.put::<DepositAddressIndexSchema>(&binding.deposit_address, &binding.mint_address)?;
        batch.put::<MintBindingSchema>(&binding.mint_address, &binding)?;
        self.db.write_schemas(batch)?;
        Ok(())
    }

    fn get_mint_binding(&self, mint_address: &str) -> DbResult<Option<MintBinding>> {
        Ok(self.db.get::<MintBindingSchema>(&mint_address.to_owned())?)
    }

    fn get_mint_binding_by_deposit_address(
        &self,
        deposit_address: &str,
    ) -> DbResult<Option<MintBinding>> {
        let Some(mint_address) = self
            .db
            .get::<DepositAddressIndexSchema>(&deposit_address.to_owned())?
        else {
            return Ok(None);
        };
        self.get_mint_binding(&mint_address)
    }

    fn get_mint_bindings(&self, filter: Option<&BTreeSet<String>>) -> DbResult<Vec<MintBinding>> {
        let mut bindings = self.all_bindings()?;
        if let Some(filter) = filter {
            bindings.retain(|b| filter.contains(&b.deposit_address));
        }
        Ok(bindings)
    }

    fn update_mint_bindings(&self, bindings: &[MintBinding]) -> DbResult<()> {
        let mut batch = SchemaBatch::new();
        for binding in bindings {
            let mut stored = self
                .db
                .get::<MintBindingSchema>(&binding.mint_address)?
                .ok_or_else(|| DbError::UnknownMintBinding(binding.mint_address.clone()))?;
            stored.approved_tax = binding.approved_tax;
            batch.put::<MintBindingSchema>(&binding.mint_address, &stored)?;
        }
        self.db.write_schemas(batch)?;
        Ok(())
    }

    fn register_withdrawal(&self, burn_address: &str, burn_index: u64) -> DbResult<()> {
        let key = (burn_address.to_owned(), burn_index);
        if self.db.get::<WithdrawalSchema>(&key)?.is_some() {
            return Err(DbError::WithdrawalExists(burn_address.to_owned(), burn_index));
        }
        self.db.put::<WithdrawalSchema>(
            &key,
            &Withdrawal::submitted(burn_address.to_owned(), burn_index),
        )?;
        Ok(())
    }

    fn get_withdrawal(
        &self,
        burn_address: &str,
        burn_index: u64,
    ) -> DbResult<Option<Withdrawal>> {
        Ok(self
            .db
            .get::<WithdrawalSchema>(&(burn_address.to_owned(), burn_index))?)
    }

    fn get_withdrawals(&self) -> DbResult<Vec<Withdrawal>> {
        let mut withdrawals = Vec::new();
        for item in self.db.iter::<WithdrawalSchema>()? {
            let (_, withdrawal) = item?.into_tuple();
            withdrawals.push(withdrawal);
        }
        Ok(withdrawals)
    }

    fn get_unapproved_withdrawals(&self) -> DbResult<Vec<Withdrawal>> {
        let mut withdrawals = self.get_withdrawals()?;
        withdrawals.retain(|w| w.is_submitted());
        Ok(withdrawals)
    }

    fn update_withdrawals(&self, withdrawals: &[Withdrawal]) -> DbResult<()> {
        let mut batch = SchemaBatch::new();
        for withdrawal in withdrawals {
            let key = (withdrawal.burn_address.clone(), withdrawal.burn_index);
            let mut stored = self.db.get::<WithdrawalSchema>(&key)?.ok_or_else(|| {
                DbError::UnknownWithdrawal(withdrawal.burn_address.clone(), withdrawal.burn_index)
            })?;
            stored.approved_amount = withdrawal.approved_amount;
            stored.approved_tax = withdrawal.approved_tax;
            batch.put::<WithdrawalSchema>(&key, &stored)?;
        }
        self.db.write_schemas(batch)?;
        Ok(())
    }

    fn dump(&self) -> DbResult<String> {
        let dump = DatabaseDump {
            used_deposit_pubkeys: self.all_used_pubkeys()?,
            mint_bindings: self.all_bindings()?,
            withdrawals: self.get_withdrawals()?,
        };
        dump.to_text()
    }

    fn reset(&self, dump: &str) -> DbResult<()> {
        let dump = DatabaseDump::from_text(dump)?;

        let mut batch = SchemaBatch::new();

        for pubkey in self.all_used_pubkeys()? {
            batch.delete::<UsedDepositPubkeySchema>(&pubkey)?;
        }
        for binding in self.all_bindings()? {
            batch.delete::<MintBindingSchema>(&binding.mint_address)?;
            batch.delete::<DepositAddressIndexSchema>(&binding.deposit_address)?;
        }
        for withdrawal in self.get_withdrawals()? {
            batch.delete::<WithdrawalSchema>(&(
                withdrawal.burn_address.clone(),
                withdrawal.burn_index,
            ))?;
        }

        for pubkey in &dump.used_deposit_pubkeys {
            batch.put::<UsedDepositPubkeySchema>(pubkey, &())?;
        }
        for binding in &dump.mint_bindings {
            batch.put::<DepositAddressIndexSchema>(&binding.deposit_address, &binding.mint_address)?;
            batch.put::<MintBindingSchema>(&binding.mint_address, binding)?;
        }
        for withdrawal in &dump.withdrawals {
            batch.put::<WithdrawalSchema>(
                &(withdrawal.burn_address.clone(), withdrawal.burn_index),
                withdrawal,
            )?;
        }

        self.db.write_schemas(batch)?;
        Ok(())
    }
}
