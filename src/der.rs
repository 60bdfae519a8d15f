//! Decoding of the two DER structures AWS KMS emits for secp256k1 keys:
//! the SubjectPublicKeyInfo envelope returned by `GetPublicKey` and the
//! ECDSA-Sig-Value (SEQUENCE of two INTEGERs) returned by `Sign`.
//!
//! No general ASN.1 machinery lives here; both shapes are handled by the
//! parsers the `k256` stack already ships.

use k256::ecdsa::Signature;
use k256::pkcs8::SubjectPublicKeyInfoRef;

#[derive(Debug, thiserror::Error)]
pub enum DerError {
    #[error("ASN.1 parse error: {0}")]
    ParseError(String),
}

/// Extracts the BIT STRING payload (the uncompressed SEC1 curve point) from
/// a DER-encoded SubjectPublicKeyInfo.
///
/// The payload is returned unchanged; whether it is a valid point on
/// secp256k1 is checked when it is parsed into a [`crate::PublicKeyRecord`].
pub fn decode_public_key(der: &[u8]) -> Result<Vec<u8>, DerError> {
    let spki = SubjectPublicKeyInfoRef::try_from(der)
        .map_err(|e| DerError::ParseError(e.to_string()))?;

    Ok(spki.subject_public_key.raw_bytes().to_vec())
}

/// Parses a DER-encoded ECDSA-Sig-Value into a fixed-width `(r, s)` pair.
///
/// `Signature::from_der` strips DER's minimal-length leading-zero padding
/// and widens each integer back to 32 big-endian bytes.
pub fn decode_signature(der: &[u8]) -> Result<Signature, DerError> {
    Signature::from_der(der).map_err(|e| DerError::ParseError(e.to_string()))
}
