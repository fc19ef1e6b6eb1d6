//! The rollup's native transaction envelope.
//!
//! Users submit transactions to the sequencer as the protobuf encoding of
//! [`RawTransaction`]: an encoded [`RawTransactionBody`] together with the
//! submitter's public key and a signature over the encoded body bytes.
//! Decoding only checks the envelope's structure; signatures, nonces and
//! balances are checked by the payload builder, which drops transactions
//! failing them.

use astria_execution_api::generated::astria::primitive::v1::Uint128;
use bytes::Bytes;
use prost::Message as _;
use sha3::{
    Digest as _,
    Keccak256,
};

use super::{
    crypto::{
        Signature,
        SigningKey,
        VerificationKey,
    },
    Address,
    ADDRESS_LEN,
};

/// The gas charged for a value transfer.
pub(crate) const TRANSFER_GAS: u64 = 21_000;

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct RawTransactionBody {
    #[prost(uint64, tag = "1")]
    pub(crate) nonce: u64,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) to: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub(crate) value: ::core::option::Option<Uint128>,
    #[prost(uint64, tag = "4")]
    pub(crate) gas_limit: u64,
    #[prost(uint64, tag = "5")]
    pub(crate) max_fee_per_gas: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub(crate) struct RawTransaction {
    #[prost(bytes = "vec", tag = "1")]
    pub(crate) body: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub(crate) verification_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub(crate) signature: Vec<u8>,
}

/// A structurally valid signed transaction.
///
/// The received body bytes are retained verbatim so that signature
/// verification operates on exactly what the submitter signed.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SignedTransaction {
    nonce: u64,
    to: Address,
    value: u128,
    gas_limit: u64,
    max_fee_per_gas: u64,
    verification_key: VerificationKey,
    signature: Signature,
    body_bytes: Bytes,
}

impl SignedTransaction {
    /// Constructs and signs a transfer with `key`.
    pub(crate) fn sign(
        nonce: u64,
        to: Address,
        value: u128,
        gas_limit: u64,
        max_fee_per_gas: u64,
        key: &SigningKey,
    ) -> Self {
        let body = RawTransactionBody {
            nonce,
            to: to.get().to_vec(),
            value: Some(value.into()),
            gas_limit,
            max_fee_per_gas,
        };
        let body_bytes = Bytes::from(body.encode_to_vec());
        let signature = key.sign(&body_bytes);
        Self {
            nonce,
            to,
            value,
            gas_limit,
            max_fee_per_gas,
            verification_key: key.verification_key(),
            signature,
            body_bytes,
        }
    }

    /// Decodes a transaction from its binary envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope or the contained body are not valid
    /// protobuf, or if the recipient, key, or signature have the wrong
    /// length. The signature itself is not verified here.
    pub(crate) fn try_from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let raw = RawTransaction::decode(bytes).map_err(TransactionError::DecodeEnvelope)?;
        let body =
            RawTransactionBody::decode(raw.body.as_slice()).map_err(TransactionError::DecodeBody)?;
        let to = <[u8; ADDRESS_LEN]>::try_from(body.to.as_slice())
            .map_err(|_| TransactionError::RecipientLength {
                received: body.to.len(),
            })
            .map(Address::new)?;
        let value = body
            .value
            .ok_or(TransactionError::ValueNotSet)?
            .into();
        let verification_key = VerificationKey::try_from_slice(&raw.verification_key)
            .map_err(|_| TransactionError::VerificationKey)?;
        let signature = Signature::try_from_slice(&raw.signature)
            .map_err(|_| TransactionError::SignatureLength {
                received: raw.signature.len(),
            })?;
        Ok(Self {
            nonce: body.nonce,
            to,
            value,
            gas_limit: body.gas_limit,
            max_fee_per_gas: body.max_fee_per_gas,
            verification_key,
            signature,
            body_bytes: raw.body.into(),
        })
    }

    #[must_use]
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        RawTransaction {
            body: self.body_bytes.to_vec(),
            verification_key: self.verification_key.to_bytes().to_vec(),
            signature: self.signature.to_bytes().to_vec(),
        }
        .encode_to_vec()
    }

    /// Checks the envelope's signature over the body bytes.
    #[must_use]
    pub(crate) fn is_signature_valid(&self) -> bool {
        self.verification_key
            .verify(&self.signature, &self.body_bytes)
            .is_ok()
    }

    #[must_use]
    pub(crate) fn sender(&self) -> Address {
        self.verification_key.address()
    }

    #[must_use]
    pub(crate) fn nonce(&self) -> u64 {
        self.nonce
    }

    #[must_use]
    pub(crate) fn to(&self) -> Address {
        self.to
    }

    #[must_use]
    pub(crate) fn value(&self) -> u128 {
        self.value
    }

    #[must_use]
    pub(crate) fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    #[must_use]
    pub(crate) fn max_fee_per_gas(&self) -> u64 {
        self.max_fee_per_gas
    }

    /// The maximum amount the sender must be able to pay for this
    /// transaction to be includable.
    #[must_use]
    pub(crate) fn cost(&self) -> Option<u128> {
        let max_fee = u128::from(self.gas_limit).checked_mul(self.max_fee_per_gas.into())?;
        self.value.checked_add(max_fee)
    }

    #[must_use]
    pub(crate) fn hash(&self) -> [u8; 32] {
        Keccak256::digest(self.to_bytes()).into()
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum TransactionError {
    #[error("failed decoding transaction envelope")]
    DecodeEnvelope(#[source] prost::DecodeError),
    #[error("failed decoding transaction body")]
    DecodeBody(#[source] prost::DecodeError),
    #[error("expected a recipient of 20 bytes, got `{received}`")]
    RecipientLength { received: usize },
    #[error("`value` field not set")]
    ValueNotSet,
    #[error("`verification_key` field is not a valid ed25519 public key")]
    VerificationKey,
    #[error("expected a signature of 64 bytes, got `{received}`")]
    SignatureLength { received: usize },
}

/// A system transaction synthesized from a sequencer bridge deposit.
///
/// `source_id` is derived deterministically from the deposit's position in
/// the chain, making the whole transaction a pure function of its inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DepositTransaction {
    pub(crate) destination: Address,
    pub(crate) amount: u128,
    pub(crate) source_id: [u8; 32],
}

impl DepositTransaction {
    #[must_use]
    pub(crate) fn hash(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(b"deposit");
        hasher.update(self.destination.get());
        hasher.update(self.amount.to_be_bytes());
        hasher.update(self.source_id);
        hasher.finalize().into()
    }
}

/// A transaction executable by the payload builder, in sequencer order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Transaction {
    Sequenced(SignedTransaction),
    Deposit(DepositTransaction),
}

impl Transaction {
    #[must_use]
    pub(crate) fn hash(&self) -> [u8; 32] {
        match self {
            Self::Sequenced(tx) => tx.hash(),
            Self::Deposit(deposit) => deposit.hash(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DepositTransaction,
        SignedTransaction,
        Transaction,
    };
    use crate::chain::{
        crypto::SigningKey,
        Address,
    };

    #[test]
    fn signed_transaction_roundtrips_through_bytes() {
        let key = SigningKey::from([42; 32]);
        let expected = SignedTransaction::sign(3, Address::new([1; 20]), 100, 21_000, 2, &key);
        let actual = SignedTransaction::try_from_bytes(&expected.to_bytes()).unwrap();
        assert_eq!(expected, actual);
        assert!(actual.is_signature_valid());
        assert_eq!(key.address(), actual.sender());
    }

    #[test]
    fn tampered_body_fails_signature_verification() {
        let key = SigningKey::from([42; 32]);
        let tx = SignedTransaction::sign(3, Address::new([1; 20]), 100, 21_000, 2, &key);
        let mut raw = tx.to_bytes();
        // flip a bit inside the recipient bytes of the encoded body
        raw[10] ^= 1;
        let decoded = SignedTransaction::try_from_bytes(&raw).unwrap();
        assert!(!decoded.is_signature_valid());
    }

    #[test]
    fn garbage_is_rejected_at_decode() {
        SignedTransaction::try_from_bytes(b"definitely not protobuf of a transaction")
            .unwrap_err();
    }

    #[test]
    fn transaction_hashes_are_distinct_per_variant() {
        let key = SigningKey::from([42; 32]);
        let sequenced = Transaction::Sequenced(SignedTransaction::sign(
            0,
            Address::new([1; 20]),
            100,
            21_000,
            2,
            &key,
        ));
        let deposit = Transaction::Deposit(DepositTransaction {
            destination: Address::new([1; 20]),
            amount: 100,
            source_id: [7; 32],
        });
        assert_ne!(sequenced.hash(), deposit.hash());
    }
}
