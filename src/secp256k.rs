//! Low-S canonicalization and recovery-id reconstruction for secp256k1
//! signatures.
//!
//! Ethereum consensus rejects high-S signatures (EIP-2), and KMS gives no
//! hint which of the two possible recovery ids belongs to a signature, so
//! both are reconstructed here from the signature and the expected key.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Rewrites `s` into its low-S representative when it exceeds half the curve
/// order; signatures already in canonical form pass through unchanged.
///
/// Negating `s` flips the recovery id's low bit, so the id must always be
/// resolved against the signature this returns.
pub fn normalize_signature(signature: Signature) -> Signature {
    signature.normalize_s().unwrap_or(signature)
}

/// Finds the recovery id (0 or 1) for which public-key recovery over
/// `digest` and `signature` reproduces `expected_point`, the signer's
/// uncompressed SEC1 encoding (0x04-tagged, 65 bytes).
///
/// Returns `None` when neither candidate matches; for a correctly produced
/// signature over the expected key exactly one always does, so `None`
/// signals a key/digest mismatch upstream.
pub fn find_recovery_id(
    digest: &[u8; 32],
    signature: &Signature,
    expected_point: &[u8; 65],
) -> Option<u8> {
    for v in 0..2u8 {
        let rec_id = match RecoveryId::from_byte(v) {
            Some(id) => id,
            None => continue,
        };

        let recovered = match VerifyingKey::recover_from_prehash(digest, signature, rec_id) {
            Ok(key) => key,
            Err(_) => continue,
        };

        if recovered.to_encoded_point(false).as_bytes() == expected_point {
            return Some(v);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::{ecdsa::SigningKey, elliptic_curve::rand_core::OsRng};

    fn uncompressed_point(key: &SigningKey) -> [u8; 65] {
        key.verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .try_into()
            .unwrap()
    }

    /// Flips `s` to `n - s`, producing the non-canonical twin of `signature`.
    fn flip_s(signature: &Signature) -> Signature {
        Signature::from_scalars(signature.r().to_bytes(), (-*signature.s()).to_bytes()).unwrap()
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let signing_key = SigningKey::random(&mut OsRng);
        let (signature, _) = signing_key.sign_prehash_recoverable(&[0x11u8; 32]).unwrap();

        let once = normalize_signature(signature);
        let twice = normalize_signature(once);

        assert_eq!(once, twice);
        // Canonical form: normalize_s has nothing left to do.
        assert!(once.normalize_s().is_none());
    }

    #[test]
    fn test_normalize_flips_high_s() {
        let signing_key = SigningKey::random(&mut OsRng);
        let (signature, _) = signing_key.sign_prehash_recoverable(&[0x22u8; 32]).unwrap();
        let low = normalize_signature(signature);
        let high = flip_s(&low);

        assert!(high.normalize_s().is_some());
        assert_eq!(normalize_signature(high), low);
    }

    #[test]
    fn test_find_recovery_id_matches_signing() {
        let signing_key = SigningKey::random(&mut OsRng);
        let expected = uncompressed_point(&signing_key);
        let digest = [0x33u8; 32];

        let (signature, rec_id) = signing_key.sign_prehash_recoverable(&digest).unwrap();
        let signature = normalize_signature(signature);

        let v = find_recovery_id(&digest, &signature, &expected).unwrap();
        assert!(v == 0 || v == 1);
        // sign_prehash_recoverable already yields low-s signatures, so the
        // ids must agree.
        assert_eq!(v, rec_id.to_byte());
    }

    #[test]
    fn test_find_recovery_id_after_high_s_normalization() {
        let signing_key = SigningKey::random(&mut OsRng);
        let expected = uncompressed_point(&signing_key);
        let digest = [0x44u8; 32];

        let (signature, _) = signing_key.sign_prehash_recoverable(&digest).unwrap();
        let high = flip_s(&normalize_signature(signature));

        // Resolving against the canonicalized signature must still succeed.
        let canonical = normalize_signature(high);
        assert!(find_recovery_id(&digest, &canonical, &expected).is_some());
    }

    #[test]
    fn test_find_recovery_id_wrong_key() {
        let signing_key = SigningKey::random(&mut OsRng);
        let other_key = SigningKey::random(&mut OsRng);
        let digest = [0x55u8; 32];

        let (signature, _) = signing_key.sign_prehash_recoverable(&digest).unwrap();
        let signature = normalize_signature(signature);

        let result = find_recovery_id(&digest, &signature, &uncompressed_point(&other_key));
        assert!(result.is_none());
    }
}
