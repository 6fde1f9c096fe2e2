//! Request handlers, one module per protocol area.

pub mod admin;
pub mod mint;
pub mod payouts;
pub mod registrar;
pub mod stats;
pub mod withdrawal;
