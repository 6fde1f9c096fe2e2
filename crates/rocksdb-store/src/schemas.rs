use wdingo_db::{MintBinding, Withdrawal};

use crate::{define_table_with_default_codec, define_table_without_codec, impl_borsh_value_codec};

define_table_with_default_codec!(
    /// Pubkeys consumed by past deposit-address registrations. Insert-only.
    (UsedDepositPubkeySchema) String => ()
);

define_table_with_default_codec!(
    /// Mint bindings keyed by mint address.
    (MintBindingSchema) String => MintBinding
);

define_table_with_default_codec!(
    /// Reverse index: deposit address to mint address.
    (DepositAddressIndexSchema) String => String
);

define_table_with_default_codec!(
    /// Withdrawals keyed by (burn address, burn index).
    (WithdrawalSchema) (String, u64) => Withdrawal
);
