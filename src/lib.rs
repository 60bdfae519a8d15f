//! # aws-kms-eth-signer
//!
//! Ethereum transaction signing backed by ECDSA (secp256k1) keys held in
//! AWS KMS.
//!
//! KMS only knows how to sign a digest and hand back a DER-encoded
//! ECDSA-Sig-Value; it has no notion of Ethereum's compact 65-byte
//! `r ‖ s ‖ v` signature format, of the low-s canonical form the network
//! requires (EIP-2), or of the recovery id that lets a verifier reconstruct
//! the signer's public key. This crate is that conversion layer:
//!
//! - [`der`] decodes the SubjectPublicKeyInfo and ECDSA-Sig-Value blobs KMS
//!   emits.
//! - [`secp256k`] canonicalizes `s` and reconstructs the recovery id by
//!   trial public-key recovery.
//! - [`cache`] keeps decoded public keys in process memory so a key's
//!   material is fetched from KMS once.
//! - [`signer::KmsSigner`] composes the pipeline and signs transactions,
//!   digests, and EIP-191 messages.
//!
//! The KMS boundary is the [`kms::KmsK256`] trait; [`kms::AwsKmsClient`]
//! implements it over `aws-sdk-kms`, and tests substitute a mock.

pub mod address;
pub mod cache;
pub mod der;
pub mod error;
pub mod kms;
pub mod models;
pub mod secp256k;
pub mod signer;

pub use cache::{PublicKeyCache, PublicKeyRecord};
pub use error::{SignerError, SignerResult};
pub use kms::{AwsKmsClient, AwsKmsSignerConfig, KmsK256};
pub use models::{EvmTransactionData, EvmTransactionDataSignature, SignTransactionResponseEvm};
pub use signer::{KmsSigner, Signer};
