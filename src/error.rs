use serde::Serialize;

/// Errors surfaced while converting KMS-produced material into Ethereum
/// signatures. Every variant carries enough context (key id, operation) to
/// diagnose the failing call; nothing is retried or downgraded internally.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
pub enum SignerError {
    #[error("KMS request failed for key '{key_id}': {reason}")]
    ExternalService { key_id: String, reason: String },

    #[error("KMS returned a malformed public key for key '{key_id}': {reason}")]
    MalformedPublicKey { key_id: String, reason: String },

    #[error("public key for key '{key_id}' is not a valid secp256k1 point: {reason}")]
    InvalidCurvePoint { key_id: String, reason: String },

    #[error("KMS returned a malformed signature for key '{key_id}': {reason}")]
    MalformedSignature { key_id: String, reason: String },

    #[error("neither recovery id reproduces the public key for key '{key_id}'")]
    RecoveryExhausted { key_id: String },

    #[error("address {actual} is not authorized to sign; signer address is {expected}")]
    NotAuthorized { expected: String, actual: String },

    #[error("conversion error: {0}")]
    ConversionError(String),
}

pub type SignerResult<T> = Result<T, SignerError>;
