use alloy::primitives::{Address, Signature};
use alloy::signers::{local::PrivateKeySigner, Signer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::canonical_json;
use crate::errors::EnvelopeError;

pub const HEIGHT_FIELD: &str = "valDingoHeight";
pub const HASH_FIELD: &str = "valDingoHash";

/// The block the sender anchored its message to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAnchor {
    pub height: u64,
    pub hash: String,
}

impl ChainAnchor {
    /// Accepts the anchor only if it is recent and on the chain this node
    /// sees: within `2 * sync_delay_threshold` blocks of the local tip, not
    /// ahead of it, and with the hash this node has at that height.
    pub fn check(
        &self,
        current_height: u64,
        hash_at_height: &str,
        sync_delay_threshold: u64,
    ) -> Result<(), EnvelopeError> {
        if self.height < current_height.saturating_sub(2 * sync_delay_threshold) {
            return Err(EnvelopeError::Expired {
                height: self.height,
                current: current_height,
            });
        }
        if self.height > current_height {
            return Err(EnvelopeError::AheadOfTip {
                height: self.height,
                current: current_height,
            });
        }
        if self.hash != hash_at_height {
            return Err(EnvelopeError::HashMismatch {
                height: self.height,
            });
        }
        Ok(())
    }
}

/// A signed wire message: `data` with the anchor fields merged in, and the
/// sender's personal-message signature over `data`'s canonical form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub data: Value,
    pub signature: String,
}

impl Envelope {
    /// Merges the anchor into `payload` and signs the canonical encoding.
    pub async fn seal<T: Serialize>(
        payload: &T,
        anchor: &ChainAnchor,
        signer: &PrivateKeySigner,
    ) -> Result<Envelope, EnvelopeError> {
        let mut data =
            serde_json::to_value(payload).map_err(|e| EnvelopeError::Payload(e.to_string()))?;
        let Some(object) = data.as_object_mut() else {
            return Err(EnvelopeError::NotAnObject);
        };
        object.insert(HEIGHT_FIELD.to_owned(), anchor.height.into());
        object.insert(HASH_FIELD.to_owned(), anchor.hash.clone().into());

        let canonical = canonical_json(&data);
        let sig = signer
            .sign_message(canonical.as_bytes())
            .await
            .map_err(|e| EnvelopeError::Signing(e.to_string()))?;

        Ok(Envelope {
            data,
            signature: format!("0x{}", alloy::hex::encode(sig.as_bytes())),
        })
    }

    /// Recovers the address that signed this envelope.
    pub fn signer(&self) -> Result<Address, EnvelopeError> {
        let bytes = alloy::hex::decode(&self.signature)
            .map_err(|e| EnvelopeError::BadSignature(e.to_string()))?;
        let sig = Signature::from_raw(&bytes)
            .map_err(|e| EnvelopeError::BadSignature(e.to_string()))?;
        let canonical = canonical_json(&self.data);
        sig.recover_address_from_msg(canonical.as_bytes())
            .map_err(|e| EnvelopeError::BadSignature(e.to_string()))
    }

    /// Point-to-point verification: the envelope must be signed by
    /// `expected`.
    pub fn verify_signer(&self, expected: Address) -> Result<(), EnvelopeError> {
        let signer = self.signer()?;
        if signer != expected {
            return Err(EnvelopeError::WrongSigner(signer));
        }
        Ok(())
    }

    /// Set verification: the envelope must be signed by exactly one of
    /// `allowed`; that signer is returned.
    pub fn verify_any_signer(&self, allowed: &[Address]) -> Result<Address, EnvelopeError> {
        let signer = self.signer()?;
        if !allowed.contains(&signer) {
            return Err(EnvelopeError::UnknownSigner(signer));
        }
        Ok(signer)
    }

    /// The chain anchor carried in `data`.
    pub fn anchor(&self) -> Result<ChainAnchor, EnvelopeError> {
        let height = self
            .data
            .get(HEIGHT_FIELD)
            .and_then(Value::as_u64)
            .ok_or(EnvelopeError::MissingAnchor)?;
        let hash = self
            .data
            .get(HASH_FIELD)
            .and_then(Value::as_str)
            .ok_or(EnvelopeError::MissingAnchor)?;
        Ok(ChainAnchor {
            height,
            hash: hash.to_owned(),
        })
    }

    /// Deserializes `data` into the method-specific payload type. Unknown
    /// fields (including the anchor) are ignored by the payload types.
    pub fn open<T: DeserializeOwned>(&self) -> Result<T, EnvelopeError> {
        serde_json::from_value(self.data.clone()).map_err(|e| EnvelopeError::Payload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const KEY_A: &str = "4c0883a69102937d6231471b5dbb6204fe51296170827936ea5cce4b76994b0f";
    const KEY_B: &str = "6370fd033278c143179d81c5526140625662b8daa446c22ee2d73db3707e620c";

    fn signer(key: &str) -> PrivateKeySigner {
        key.parse().unwrap()
    }

    fn anchor() -> ChainAnchor {
        ChainAnchor {
            height: 500_000,
            hash: "00000000aa".to_owned(),
        }
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Payload {
        #[serde(rename = "mintAddress")]
        mint_address: String,
    }

    #[tokio::test]
    async fn seal_and_verify_round_trip() {
        let a = signer(KEY_A);
        let payload = Payload {
            mint_address: "0xmint".to_owned(),
        };
        let env = Envelope::seal(&payload, &anchor(), &a).await.unwrap();

        assert_eq!(env.data["valDingoHeight"], json!(500_000));
        assert_eq!(env.data["valDingoHash"], json!("00000000aa"));

        env.verify_signer(a.address()).unwrap();
        assert_eq!(env.anchor().unwrap(), anchor());
        assert_eq!(env.open::<Payload>().unwrap(), payload);
    }

    #[tokio::test]
    async fn tampered_data_fails_verification() {
        let a = signer(KEY_A);
        let payload = Payload {
            mint_address: "0xmint".to_owned(),
        };
        let mut env = Envelope::seal(&payload, &anchor(), &a).await.unwrap();
        env.data["mintAddress"] = json!("0xevil");

        assert!(env.verify_signer(a.address()).is_err());
    }

    #[tokio::test]
    async fn wrong_signer_is_rejected() {
        let a = signer(KEY_A);
        let b = signer(KEY_B);
        let payload = Payload {
            mint_address: "0xmint".to_owned(),
        };
        let env = Envelope::seal(&payload, &anchor(), &a).await.unwrap();

        assert!(matches!(
            env.verify_signer(b.address()),
            Err(EnvelopeError::WrongSigner(addr)) if addr == a.address()
        ));

        // Set verification returns the one matching authority.
        let found = env
            .verify_any_signer(&[b.address(), a.address()])
            .unwrap();
        assert_eq!(found, a.address());
        assert!(matches!(
            env.verify_any_signer(&[b.address()]),
            Err(EnvelopeError::UnknownSigner(_))
        ));
    }

    #[test]
    fn anchor_window_checks() {
        let anchor = ChainAnchor {
            height: 1_000,
            hash: "aa".to_owned(),
        };

        // Fresh: tip a little past the anchor, same hash.
        anchor.check(1_005, "aa", 5).unwrap();
        // Boundary: exactly 2 * threshold behind is still valid.
        anchor.check(1_010, "aa", 5).unwrap();
        assert!(matches!(
            anchor.check(1_011, "aa", 5),
            Err(EnvelopeError::Expired { .. })
        ));
        assert!(matches!(
            anchor.check(999, "aa", 5),
            Err(EnvelopeError::AheadOfTip { .. })
        ));
        assert!(matches!(
            anchor.check(1_005, "bb", 5),
            Err(EnvelopeError::HashMismatch { .. })
        ));
    }
}
