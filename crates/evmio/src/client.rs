//! The EVM provider client and the authority's token-chain signing key.

use std::collections::HashMap;

use alloy::{
    network::Ethereum,
    primitives::{eip191_hash_message, keccak256, Address, Signature, U256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, ProviderBuilder, RootProvider,
    },
    signers::{local::PrivateKeySigner, Signer},
    sol_types::SolValue,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use wdingo_primitives::{BurnRecord, Sats};

use crate::contract::IWrappedDingo;
use crate::error::{EvmClientError, EvmClientResult};

/// HTTP provider with the recommended fillers.
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Mint progress of one mint address as recorded by the contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintHistory {
    pub mint_nonce: u64,
    pub minted_amount: Sats,
}

/// The `(v, r, s)` triple the contract's mint verifier checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnContractVerification {
    pub v: u64,
    pub r: String,
    pub s: String,
}

/// Client for the token chain: contract reads plus this authority's
/// secp256k1 signing identity.
pub struct EvmClient {
    chain_id: u64,
    signer: PrivateKeySigner,
    contract: IWrappedDingo::IWrappedDingoInstance<HttpProvider>,
    /// Burns are immutable once on chain; cache them for the process
    /// lifetime so payout approval can replay them without provider RPC.
    burn_cache: RwLock<HashMap<(Address, u64), BurnRecord>>,
}

impl EvmClient {
    pub fn new(
        provider_url: &str,
        chain_id: u64,
        contract_address: &str,
        private_key_hex: &str,
    ) -> EvmClientResult<Self> {
        let url: url::Url = provider_url
            .parse()
            .map_err(|e: url::ParseError| EvmClientError::InvalidProviderUrl(e.to_string()))?;
        let provider = ProviderBuilder::new().connect_http(url);

        let contract_address: Address = contract_address
            .parse()
            .map_err(|_| EvmClientError::InvalidAddress(contract_address.to_owned()))?;
        let contract = IWrappedDingo::new(contract_address, provider);

        let signer: PrivateKeySigner = private_key_hex
            .trim()
            .parse()
            .map_err(|_| EvmClientError::InvalidPrivateKey("unparseable key".to_owned()))?;

        Ok(Self {
            chain_id,
            signer,
            contract,
            burn_cache: RwLock::new(HashMap::new()),
        })
    }

    /// This authority's wallet address on the token chain.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The in-process signing key, for sealing envelopes. Never leaves the
    /// process.
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// EIP-191 personal-message signature over `msg`, hex encoded as
    /// `0x{r}{s}{v}`.
    pub async fn sign_message(&self, msg: &[u8]) -> EvmClientResult<String> {
        let sig = self
            .signer
            .sign_message(msg)
            .await
            .map_err(|e| EvmClientError::Signer(e.to_string()))?;
        Ok(encode_signature(&sig))
    }

    /// Whether `signature` is `expected`'s personal-message signature over
    /// `msg`.
    pub fn verify_message(msg: &[u8], signature: &str, expected: Address) -> bool {
        recover_message_signer(msg, signature).is_ok_and(|addr| addr == expected)
    }

    /// Produces the signature the contract's `mint` entry point verifies:
    /// a personal-message signature over
    /// `keccak256(abi.encode(chainId, mintAddress, mintNonce, depositAddress, mintAmount))`.
    ///
    /// The tuple layout must match the contract byte-for-byte; the nonce is
    /// read from the chain and never advanced locally.
    pub async fn sign_mint_transaction(
        &self,
        mint_address: Address,
        mint_nonce: u64,
        deposit_address: &str,
        mint_amount: Sats,
    ) -> EvmClientResult<OnContractVerification> {
        let encoded = (
            U256::from(self.chain_id),
            mint_address,
            U256::from(mint_nonce),
            deposit_address.to_owned(),
            U256::from(mint_amount.to_sat()),
        )
            .abi_encode();
        let digest = keccak256(&encoded);

        let sig = self
            .signer
            .sign_message(digest.as_slice())
            .await
            .map_err(|e| EvmClientError::Signer(e.to_string()))?;

        Ok(OnContractVerification {
            v: 27 + sig.v() as u64,
            r: format!("0x{:064x}", sig.r()),
            s: format!("0x{:064x}", sig.s()),
        })
    }

    /// Mint nonce and cumulative minted amount for a bound pair.
    pub async fn get_mint_history(
        &self,
        mint_address: Address,
        deposit_address: &str,
    ) -> EvmClientResult<MintHistory> {
        let ret = self
            .contract
            .mintHistory(mint_address, deposit_address.to_owned())
            .call()
            .await
            .map_err(|e| EvmClientError::Contract(e.to_string()))?;

        Ok(MintHistory {
            mint_nonce: u256_to_u64(ret.mintNonce)?,
            minted_amount: u256_to_sats(ret.mintedAmount)?,
        })
    }

    pub async fn get_burn_count(&self, burn_address: Address) -> EvmClientResult<u64> {
        let len = self
            .contract
            .burnHistoryLength(burn_address)
            .call()
            .await
            .map_err(|e| EvmClientError::Contract(e.to_string()))?;
        u256_to_u64(len)
    }

    /// One burn event, memoized. Fails with `UnknownBurn` when the index is
    /// past the end of the burner's history.
    pub async fn get_burn_history(
        &self,
        burn_address: Address,
        burn_index: u64,
    ) -> EvmClientResult<BurnRecord> {
        if let Some(record) = self.burn_cache.read().await.get(&(burn_address, burn_index)) {
            return Ok(record.clone());
        }

        let len = self.get_burn_count(burn_address).await?;
        if burn_index >= len {
            return Err(EvmClientError::UnknownBurn(
                burn_address.to_string(),
                burn_index,
            ));
        }

        let ret = self
            .contract
            .burnHistory(burn_address, U256::from(burn_index))
            .call()
            .await
            .map_err(|e| EvmClientError::Contract(e.to_string()))?;

        let record = BurnRecord {
            burn_destination: ret.burnDestination,
            burn_amount: u256_to_sats(ret.burnAmount)?,
        };
        self.burn_cache
            .write()
            .await
            .insert((burn_address, burn_index), record.clone());
        Ok(record)
    }

    /// The burner's entire burn history, in index order.
    pub async fn get_burn_history_all(
        &self,
        burn_address: Address,
    ) -> EvmClientResult<Vec<BurnRecord>> {
        let len = self.get_burn_count(burn_address).await?;
        let mut burns = Vec::with_capacity(len as usize);
        for index in 0..len {
            burns.push(self.get_burn_history(burn_address, index).await?);
        }
        Ok(burns)
    }
}

fn encode_signature(sig: &Signature) -> String {
    let mut bytes = [0u8; 65];
    bytes[..32].copy_from_slice(&sig.r().to_be_bytes::<32>());
    bytes[32..64].copy_from_slice(&sig.s().to_be_bytes::<32>());
    bytes[64] = 27 + sig.v() as u8;
    format!("0x{}", alloy::hex::encode(bytes))
}

/// Recovers the personal-message signer of `msg` from a hex `0x{r}{s}{v}`
/// signature.
pub fn recover_message_signer(msg: &[u8], signature: &str) -> EvmClientResult<Address> {
    let bytes = alloy::hex::decode(signature)
        .map_err(|e| EvmClientError::InvalidSignature(e.to_string()))?;
    let sig = Signature::from_raw(&bytes)
        .map_err(|e| EvmClientError::InvalidSignature(e.to_string()))?;
    sig.recover_address_from_prehash(&eip191_hash_message(msg))
        .map_err(|e| EvmClientError::InvalidSignature(e.to_string()))
}

fn u256_to_u64(value: U256) -> EvmClientResult<u64> {
    value
        .try_into()
        .map_err(|_| EvmClientError::AmountOutOfRange(value.to_string()))
}

fn u256_to_sats(value: U256) -> EvmClientResult<Sats> {
    u256_to_u64(value).map(Sats::from_sat)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe51296170827936ea5cce4b76994b0f";

    fn signer() -> PrivateKeySigner {
        TEST_KEY.parse().unwrap()
    }

    #[tokio::test]
    async fn personal_sign_round_trips() {
        let signer = signer();
        let msg = b"the authority attests";
        let sig = signer.sign_message(msg).await.unwrap();
        let encoded = encode_signature(&sig);

        assert_eq!(recover_message_signer(msg, &encoded).unwrap(), signer.address());
        assert!(EvmClient::verify_message(msg, &encoded, signer.address()));
        assert!(!EvmClient::verify_message(b"another message", &encoded, signer.address()));
        assert!(!EvmClient::verify_message(msg, &encoded, Address::ZERO));
    }

    #[tokio::test]
    async fn mint_signature_recovers_to_signer() {
        let signer = signer();
        let mint_address: Address = "0x00000000000000000000000000000000000000aa"
            .parse()
            .unwrap();
        let deposit_address = "DDepositXXXXXXXXXXXXXXXXXXXXXXXXXX";
        let chain_id = 568u64;
        let amount = Sats::from_sat(3_960_000_000);

        let encoded = (
            U256::from(chain_id),
            mint_address,
            U256::from(7u64),
            deposit_address.to_owned(),
            U256::from(amount.to_sat()),
        )
            .abi_encode();
        let digest = keccak256(&encoded);

        let sig = signer.sign_message(digest.as_slice()).await.unwrap();
        let verification = OnContractVerification {
            v: 27 + sig.v() as u64,
            r: format!("0x{:064x}", sig.r()),
            s: format!("0x{:064x}", sig.s()),
        };

        // Reassemble (v, r, s) and recover; the contract performs the same
        // steps over the same digest.
        let raw = format!(
            "{}{}{:02x}",
            verification.r.trim_start_matches("0x"),
            verification.s.trim_start_matches("0x"),
            verification.v
        );
        let recovered = recover_message_signer(digest.as_slice(), &raw).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn verification_serializes_plain_field_names() {
        let v = OnContractVerification {
            v: 27,
            r: "0xr".into(),
            s: "0xs".into(),
        };
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["v"], 27);
        assert_eq!(json["r"], "0xr");
    }
}
