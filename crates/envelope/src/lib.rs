//! Signed, time-bounded inter-node message envelopes.
//!
//! Every authority-to-authority and authority-to-user reply is wrapped in an
//! [`Envelope`]: a JSON payload carrying a recent Dingo block height and
//! that block's hash, signed by the sender's token-chain key over the
//! canonical serialization of the payload. Verification pins each message
//! to a live view of the chain, so approvals cannot be replayed across
//! forks or after they have gone stale.

pub mod canonical;
pub mod envelope;
pub mod errors;

pub use canonical::canonical_json;
pub use envelope::{ChainAnchor, Envelope, HASH_FIELD, HEIGHT_FIELD};
pub use errors::EnvelopeError;
