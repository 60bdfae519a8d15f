//! # KMS-backed Ethereum transaction signer
//!
//! [`KmsSigner`] composes the pipeline that turns AWS KMS output into the
//! 65-byte recoverable signatures Ethereum expects:
//!
//! ```text
//! KmsSigner
//!   ├── PublicKeyCache (read, populate on miss)
//!   ├── der::decode_public_key / decode_signature
//!   ├── secp256k::normalize_signature (EIP-2 low-s)
//!   └── secp256k::find_recovery_id (trial public-key recovery)
//! ```
//!
//! Failures of any stage propagate to the caller unchanged; there is no
//! internal retry. Retry policy for transient KMS failures belongs to the
//! caller.

use alloy::consensus::{SignableTransaction, TxEip1559, TxLegacy};
use alloy::primitives::{keccak256, utils::eip191_message, Address, PrimitiveSignature};
use async_trait::async_trait;
use tracing::debug;

use crate::{
    cache::{PublicKeyCache, PublicKeyRecord},
    der,
    error::{SignerError, SignerResult},
    kms::{AwsKmsClient, AwsKmsSignerConfig, KmsK256},
    models::{EvmTransactionData, EvmTransactionDataSignature, SignTransactionResponseEvm},
    secp256k,
};

/// Caller-facing signing surface.
#[async_trait]
pub trait Signer: Send + Sync {
    /// The Ethereum address derived from the signer's public key.
    async fn address(&self) -> SignerResult<Address>;

    /// Signs an EVM transaction. Fails with [`SignerError::NotAuthorized`]
    /// when the transaction's `from` is not the signer's address, before any
    /// KMS call is made.
    async fn sign_transaction(
        &self,
        transaction: &EvmTransactionData,
    ) -> SignerResult<SignTransactionResponseEvm>;
}

/// Ethereum signer holding one KMS key. Each instance owns its public-key
/// cache, so independent signers never share state.
#[derive(Debug)]
pub struct KmsSigner<T: KmsK256 = AwsKmsClient> {
    client: T,
    key_id: String,
    cache: PublicKeyCache,
}

impl KmsSigner<AwsKmsClient> {
    /// Builds a signer over a live AWS KMS client using the default
    /// credential chain.
    pub async fn connect(config: AwsKmsSignerConfig) -> Self {
        let client = AwsKmsClient::new(config.region).await;
        Self::new(client, config.key_id)
    }
}

impl<T: KmsK256> KmsSigner<T> {
    pub fn new(client: T, key_id: impl Into<String>) -> Self {
        Self {
            client,
            key_id: key_id.into(),
            cache: PublicKeyCache::new(),
        }
    }

    /// Resolves the key's public-key record, fetching and decoding the
    /// SubjectPublicKeyInfo blob on the first call and serving the cache
    /// afterwards. Concurrent first calls may fetch twice; both decode to
    /// the same record.
    pub async fn public_key(&self) -> SignerResult<PublicKeyRecord> {
        if let Some(record) = self.cache.get(&self.key_id).await {
            return Ok(record);
        }

        let spki_der = self.client.get_der_public_key(&self.key_id).await?;

        let point = der::decode_public_key(&spki_der).map_err(|e| {
            SignerError::MalformedPublicKey {
                key_id: self.key_id.clone(),
                reason: e.to_string(),
            }
        })?;

        let record =
            PublicKeyRecord::from_sec1_bytes(&point).map_err(|e| SignerError::InvalidCurvePoint {
                key_id: self.key_id.clone(),
                reason: e.to_string(),
            })?;

        debug!(key_id = %self.key_id, address = %record.address(), "decoded KMS public key");

        self.cache.insert(&self.key_id, record.clone()).await;

        Ok(record)
    }

    /// Signs a 32-byte digest and returns the 65-byte `r ‖ s ‖ v` signature
    /// with `s` in low-S form and `v ∈ {0, 1}`.
    ///
    /// Recovering the public key from the returned signature and `digest`
    /// always yields this signer's key; that is verified here on every call,
    /// not assumed.
    pub async fn sign_digest(&self, digest: [u8; 32]) -> SignerResult<[u8; 65]> {
        let record = self.public_key().await?;

        let der_signature = self.client.sign_digest(&self.key_id, digest).await?;

        let signature = der::decode_signature(&der_signature).map_err(|e| {
            SignerError::MalformedSignature {
                key_id: self.key_id.clone(),
                reason: e.to_string(),
            }
        })?;

        // The recovery id is only meaningful for the canonical s.
        let signature = secp256k::normalize_signature(signature);

        let v = secp256k::find_recovery_id(&digest, &signature, record.uncompressed()).ok_or(
            SignerError::RecoveryExhausted {
                key_id: self.key_id.clone(),
            },
        )?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = v;

        Ok(out)
    }

    /// Signs an EIP-191 personal message: the payload is prefixed and
    /// keccak256-hashed before signing. Returns `v ∈ {27, 28}` as
    /// personal-sign verifiers expect.
    pub async fn sign_message(&self, message: &[u8]) -> SignerResult<[u8; 65]> {
        let digest = keccak256(eip191_message(message)).0;

        let mut signature = self.sign_digest(digest).await?;
        signature[64] += 27;

        Ok(signature)
    }

    async fn authorize(&self, transaction: &EvmTransactionData) -> SignerResult<Address> {
        let signer_address = self.public_key().await?.address();
        let candidate = transaction.from_address()?;

        if candidate != signer_address {
            return Err(SignerError::NotAuthorized {
                expected: signer_address.to_string(),
                actual: transaction.from.clone(),
            });
        }

        Ok(signer_address)
    }
}

#[async_trait]
impl<T: KmsK256> Signer for KmsSigner<T> {
    async fn address(&self) -> SignerResult<Address> {
        Ok(self.public_key().await?.address())
    }

    async fn sign_transaction(
        &self,
        transaction: &EvmTransactionData,
    ) -> SignerResult<SignTransactionResponseEvm> {
        self.authorize(transaction).await?;

        if transaction.is_eip1559() {
            let unsigned = TxEip1559::try_from(transaction)?;

            let sig_bytes = self.sign_digest(unsigned.signature_hash().0).await?;
            let signature = PrimitiveSignature::from_raw(&sig_bytes)
                .map_err(|e| SignerError::ConversionError(e.to_string()))?;

            let mut signature_bytes = signature.as_bytes();
            let signed = unsigned.into_signed(signature);

            // Typed transactions carry the parity bit, not 27/28.
            if signature_bytes[64] == 27 {
                signature_bytes[64] = 0;
            } else if signature_bytes[64] == 28 {
                signature_bytes[64] = 1;
            }

            let mut raw = Vec::with_capacity(signed.eip2718_encoded_length());
            signed.eip2718_encode(&mut raw);

            Ok(SignTransactionResponseEvm {
                hash: signed.hash().to_string(),
                signature: EvmTransactionDataSignature::from(&signature_bytes),
                raw,
            })
        } else {
            let unsigned = TxLegacy::try_from(transaction)?;

            let sig_bytes = self.sign_digest(unsigned.signature_hash().0).await?;
            let signature = PrimitiveSignature::from_raw(&sig_bytes)
                .map_err(|e| SignerError::ConversionError(e.to_string()))?;

            let signature_bytes = signature.as_bytes();
            let signed = unsigned.into_signed(signature);

            let mut raw = Vec::with_capacity(signed.rlp_encoded_length());
            signed.rlp_encode(&mut raw);

            Ok(SignTransactionResponseEvm {
                hash: signed.hash().to_string(),
                signature: EvmTransactionDataSignature::from(&signature_bytes),
                raw,
            })
        }
    }
}
