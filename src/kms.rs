//! AWS KMS boundary: the [`KmsK256`] trait is the abstract contract the
//! signer consumes (fetch a DER public key, sign a digest), and
//! [`AwsKmsClient`] is its production implementation over `aws-sdk-kms`.
//!
//! Both operations block on network I/O; cancellation and timeouts belong to
//! the SDK configuration, and outcomes propagate to the caller unchanged.
//! `KmsK256` is mocked with `mockall` in the signer tests.

use async_trait::async_trait;
use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, Region};
use aws_sdk_kms::{
    primitives::Blob,
    types::{MessageType, SigningAlgorithmSpec},
    Client,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SignerError, SignerResult};

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwsKmsSignerConfig {
    /// AWS region; falls back to the default provider chain when unset.
    pub region: Option<String>,
    /// Key id or ARN of the secp256k1 signing key held in KMS.
    pub key_id: String,
}

/// secp256k1 (ECDSA) operations exposed by the external signing service.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait KmsK256: Send + Sync {
    /// Fetches the DER-encoded SubjectPublicKeyInfo blob for `key_id`.
    async fn get_der_public_key<'a, 'b>(&'a self, key_id: &'b str) -> SignerResult<Vec<u8>>;

    /// Signs a 32-byte digest with `key_id` using ECDSA_SHA_256 in DIGEST
    /// mode. Returns the DER-encoded ECDSA-Sig-Value.
    async fn sign_digest<'a, 'b>(&'a self, key_id: &'b str, digest: [u8; 32])
        -> SignerResult<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct AwsKmsClient {
    inner: Client,
}

impl AwsKmsClient {
    pub async fn new(region: Option<String>) -> Self {
        let region_provider =
            RegionProviderChain::first_try(region.map(Region::new)).or_default_provider();

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        Self {
            inner: Client::new(&config),
        }
    }
}

#[async_trait]
impl KmsK256 for AwsKmsClient {
    async fn get_der_public_key<'a, 'b>(&'a self, key_id: &'b str) -> SignerResult<Vec<u8>> {
        debug!(key_id, "fetching public key from AWS KMS");

        let output = self
            .inner
            .get_public_key()
            .key_id(key_id)
            .send()
            .await
            .map_err(|e| SignerError::ExternalService {
                key_id: key_id.to_string(),
                reason: format!("GetPublicKey failed: {e:?}"),
            })?;

        let der = output
            .public_key
            .ok_or_else(|| SignerError::ExternalService {
                key_id: key_id.to_string(),
                reason: "no public key blob in GetPublicKey response".to_string(),
            })?
            .into_inner();

        Ok(der)
    }

    async fn sign_digest<'a, 'b>(
        &'a self,
        key_id: &'b str,
        digest: [u8; 32],
    ) -> SignerResult<Vec<u8>> {
        debug!(key_id, "signing digest with AWS KMS");

        let output = self
            .inner
            .sign()
            .key_id(key_id)
            .signing_algorithm(SigningAlgorithmSpec::EcdsaSha256)
            .message_type(MessageType::Digest)
            .message(Blob::new(digest))
            .send()
            .await
            .map_err(|e| SignerError::ExternalService {
                key_id: key_id.to_string(),
                reason: format!("Sign failed: {e:?}"),
            })?;

        let der = output
            .signature
            .ok_or_else(|| SignerError::ExternalService {
                key_id: key_id.to_string(),
                reason: "no signature in Sign response".to_string(),
            })?
            .into_inner();

        Ok(der)
    }
}
