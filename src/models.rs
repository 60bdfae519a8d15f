//! Transaction and signature models exchanged with callers, plus their
//! conversions into the alloy consensus types used for signing-digest
//! computation and encoding.

use alloy::consensus::{TxEip1559, TxLegacy};
use alloy::eips::eip2930::AccessList;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use serde::{Deserialize, Serialize};

use crate::error::SignerError;

/// An unsigned EVM transaction as supplied by the caller. `from` is the
/// candidate signing address and must match the KMS key's derived address.
///
/// Setting either EIP-1559 fee field selects typed (EIP-2718) encoding;
/// otherwise the transaction signs and encodes as legacy with the EIP-155
/// chain-id-aware digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmTransactionData {
    pub from: String,
    pub to: Option<String>,
    pub value: U256,
    pub data: Option<String>,
    pub nonce: u64,
    pub chain_id: u64,
    pub gas_limit: u64,
    pub gas_price: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl EvmTransactionData {
    pub fn is_eip1559(&self) -> bool {
        self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
    }

    pub fn from_address(&self) -> Result<Address, SignerError> {
        self.from
            .parse()
            .map_err(|e| SignerError::ConversionError(format!("invalid from address: {e}")))
    }

    fn tx_kind(&self) -> Result<TxKind, SignerError> {
        match &self.to {
            Some(to) => {
                let address: Address = to.parse().map_err(|e| {
                    SignerError::ConversionError(format!("invalid to address: {e}"))
                })?;
                Ok(TxKind::Call(address))
            }
            None => Ok(TxKind::Create),
        }
    }

    fn input_bytes(&self) -> Result<Bytes, SignerError> {
        match &self.data {
            Some(data) => {
                let hex_str = data.strip_prefix("0x").unwrap_or(data);
                hex::decode(hex_str)
                    .map(Bytes::from)
                    .map_err(|e| SignerError::ConversionError(format!("invalid data hex: {e}")))
            }
            None => Ok(Bytes::new()),
        }
    }
}

impl TryFrom<&EvmTransactionData> for TxLegacy {
    type Error = SignerError;

    fn try_from(tx: &EvmTransactionData) -> Result<Self, Self::Error> {
        Ok(TxLegacy {
            chain_id: Some(tx.chain_id),
            nonce: tx.nonce,
            gas_price: tx.gas_price.unwrap_or_default(),
            gas_limit: tx.gas_limit,
            to: tx.tx_kind()?,
            value: tx.value,
            input: tx.input_bytes()?,
        })
    }
}

impl TryFrom<&EvmTransactionData> for TxEip1559 {
    type Error = SignerError;

    fn try_from(tx: &EvmTransactionData) -> Result<Self, Self::Error> {
        Ok(TxEip1559 {
            chain_id: tx.chain_id,
            nonce: tx.nonce,
            gas_limit: tx.gas_limit,
            max_fee_per_gas: tx.max_fee_per_gas.unwrap_or_default(),
            max_priority_fee_per_gas: tx.max_priority_fee_per_gas.unwrap_or_default(),
            to: tx.tx_kind()?,
            value: tx.value,
            access_list: AccessList::default(),
            input: tx.input_bytes()?,
        })
    }
}

/// A 65-byte `r ‖ s ‖ v` signature split into its components, hex encoded.
/// `v` is the Ethereum convention value (27/28) carried by the encoded
/// transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmTransactionDataSignature {
    pub r: String,
    pub s: String,
    pub v: u64,
    pub sig: String,
}

impl From<&[u8; 65]> for EvmTransactionDataSignature {
    fn from(bytes: &[u8; 65]) -> Self {
        Self {
            r: hex::encode(&bytes[0..32]),
            s: hex::encode(&bytes[32..64]),
            v: bytes[64] as u64,
            sig: hex::encode(bytes),
        }
    }
}

/// The outcome of signing: the transaction hash, the split signature, and
/// the broadcast-ready encoded bytes (RLP for legacy, EIP-2718 for typed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignTransactionResponseEvm {
    pub hash: String,
    pub signature: EvmTransactionDataSignature,
    pub raw: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_tx() -> EvmTransactionData {
        EvmTransactionData {
            from: "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".to_string(),
            to: Some("0x742d35Cc6634C0532925a3b844Bc454e4438f44f".to_string()),
            value: U256::from(1_000_000_000_000_000_000u64),
            data: Some("0xdeadbeef".to_string()),
            nonce: 7,
            chain_id: 1,
            gas_limit: 21_000,
            gas_price: Some(20_000_000_000),
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        }
    }

    #[test]
    fn test_is_eip1559_discrimination() {
        let mut tx = legacy_tx();
        assert!(!tx.is_eip1559());

        tx.gas_price = None;
        tx.max_fee_per_gas = Some(30_000_000_000);
        tx.max_priority_fee_per_gas = Some(1_000_000_000);
        assert!(tx.is_eip1559());
    }

    #[test]
    fn test_try_into_legacy() {
        let tx = legacy_tx();
        let legacy = TxLegacy::try_from(&tx).unwrap();

        assert_eq!(legacy.chain_id, Some(1));
        assert_eq!(legacy.nonce, 7);
        assert_eq!(legacy.gas_price, 20_000_000_000);
        assert_eq!(legacy.input.as_ref(), [0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(legacy.to, TxKind::Call(_)));
    }

    #[test]
    fn test_try_into_eip1559() {
        let mut tx = legacy_tx();
        tx.gas_price = None;
        tx.max_fee_per_gas = Some(30_000_000_000);
        tx.max_priority_fee_per_gas = Some(1_000_000_000);
        tx.to = None;

        let eip1559 = TxEip1559::try_from(&tx).unwrap();
        assert_eq!(eip1559.chain_id, 1);
        assert_eq!(eip1559.max_fee_per_gas, 30_000_000_000);
        assert!(matches!(eip1559.to, TxKind::Create));
    }

    #[test]
    fn test_invalid_data_hex() {
        let mut tx = legacy_tx();
        tx.data = Some("0xnothex".to_string());

        let result = TxLegacy::try_from(&tx);
        assert!(matches!(result, Err(SignerError::ConversionError(_))));
    }

    #[test]
    fn test_invalid_to_address() {
        let mut tx = legacy_tx();
        tx.to = Some("not-an-address".to_string());

        let result = TxLegacy::try_from(&tx);
        assert!(matches!(result, Err(SignerError::ConversionError(_))));
    }

    #[test]
    fn test_signature_split() {
        let mut bytes = [0u8; 65];
        bytes[0] = 0xaa;
        bytes[32] = 0xbb;
        bytes[64] = 27;

        let signature = EvmTransactionDataSignature::from(&bytes);
        assert_eq!(signature.v, 27);
        assert!(signature.r.starts_with("aa"));
        assert!(signature.s.starts_with("bb"));
        assert_eq!(signature.sig.len(), 130);
    }
}
