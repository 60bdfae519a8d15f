//! Process-local cache of decoded KMS public keys.
//!
//! Keys held in KMS are few and live for the whole process, so the cache has
//! no eviction, TTL, or capacity bound. Each [`crate::KmsSigner`] owns its
//! own instance; there is no global singleton. Two tasks missing on the same
//! key id may both fetch and both insert; the records are identical so the
//! duplicate work is benign.

use std::collections::HashMap;

use alloy::primitives::Address;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use tokio::sync::RwLock;

use crate::address::derive_ethereum_address;

/// A secp256k1 public key decoded from the KMS SubjectPublicKeyInfo blob,
/// held alongside its uncompressed SEC1 encoding (0x04 ‖ X ‖ Y). The
/// encoding is what recovery comparison and address derivation consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyRecord {
    key: k256::PublicKey,
    uncompressed: [u8; 65],
}

impl PublicKeyRecord {
    /// Parses SEC1 point bytes into a validated curve point. This is where
    /// an off-curve or mis-tagged point from KMS is rejected.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, k256::elliptic_curve::Error> {
        let key = k256::PublicKey::from_sec1_bytes(bytes)?;
        let uncompressed: [u8; 65] = key
            .to_encoded_point(false)
            .as_bytes()
            .try_into()
            .map_err(|_| k256::elliptic_curve::Error)?;

        Ok(Self { key, uncompressed })
    }

    /// The uncompressed SEC1 encoding, 0x04-tagged.
    pub fn uncompressed(&self) -> &[u8; 65] {
        &self.uncompressed
    }

    /// The 64 raw point bytes, tag stripped.
    pub fn point_bytes(&self) -> &[u8] {
        &self.uncompressed[1..]
    }

    pub fn public_key(&self) -> &k256::PublicKey {
        &self.key
    }

    /// The Ethereum address owned by this key.
    pub fn address(&self) -> Address {
        derive_ethereum_address(&self.uncompressed)
    }
}

/// Thread-safe key-id → public-key map. Reads run concurrently; an insert
/// excludes readers for the duration of the single map write.
#[derive(Debug, Default)]
pub struct PublicKeyCache {
    keys: RwLock<HashMap<String, PublicKeyRecord>>,
}

impl PublicKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absence is the normal miss signal telling the caller to fetch and
    /// populate; it is not an error.
    pub async fn get(&self, key_id: &str) -> Option<PublicKeyRecord> {
        self.keys.read().await.get(key_id).cloned()
    }

    pub async fn insert(&self, key_id: impl Into<String>, record: PublicKeyRecord) {
        self.keys.write().await.insert(key_id.into(), record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::{ecdsa::SigningKey, elliptic_curve::rand_core::OsRng};

    fn test_record() -> PublicKeyRecord {
        let signing_key = SigningKey::random(&mut OsRng);
        let point = signing_key.verifying_key().to_encoded_point(false);
        PublicKeyRecord::from_sec1_bytes(point.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let cache = PublicKeyCache::new();
        let record = test_record();

        cache.insert("key-a", record.clone()).await;
        assert_eq!(cache.get("key-a").await, Some(record));
    }

    #[tokio::test]
    async fn test_get_absent() {
        let cache = PublicKeyCache::new();
        assert!(cache.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_records_are_independent_per_key_id() {
        let cache = PublicKeyCache::new();
        let a = test_record();
        let b = test_record();

        cache.insert("key-a", a.clone()).await;
        cache.insert("key-b", b.clone()).await;

        assert_eq!(cache.get("key-a").await, Some(a));
        assert_eq!(cache.get("key-b").await, Some(b));
    }

    #[test]
    fn test_record_rejects_off_curve_point() {
        let mut bytes = [0u8; 65];
        bytes[0] = 0x04;
        bytes[64] = 0x07;

        assert!(PublicKeyRecord::from_sec1_bytes(&bytes).is_err());
    }

    #[test]
    fn test_record_exposes_uncompressed_encoding() {
        let record = test_record();
        assert_eq!(record.uncompressed()[0], 0x04);
        assert_eq!(record.point_bytes().len(), 64);
    }
}
