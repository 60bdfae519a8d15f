//! Derivation of Ethereum addresses from secp256k1 public keys.

use alloy::primitives::{keccak256, Address};

/// Derives the Ethereum address for an uncompressed SEC1 public key:
/// keccak256 over the 64 point bytes (the 0x04 tag is excluded), keeping the
/// low-order 20 bytes of the hash.
pub fn derive_ethereum_address(uncompressed_point: &[u8; 65]) -> Address {
    let hash = keccak256(&uncompressed_point[1..]);

    Address::from_slice(&hash[12..])
}
