use sha2::{
    Digest as _,
    Sha256,
};

use super::{
    Address,
    ADDRESS_LEN,
};

/// An ed25519 signing key for the rollup's native transactions.
pub(crate) struct SigningKey(ed25519_consensus::SigningKey);

impl SigningKey {
    pub(crate) fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.0.sign(message))
    }

    #[must_use]
    pub(crate) fn verification_key(&self) -> VerificationKey {
        VerificationKey(self.0.verification_key())
    }

    #[must_use]
    pub(crate) fn address(&self) -> Address {
        self.verification_key().address()
    }
}

impl From<[u8; 32]> for SigningKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(ed25519_consensus::SigningKey::from(bytes))
    }
}

/// An ed25519 verification key.
///
/// The account address of a key is the first 20 bytes of the sha256 digest
/// of its byte encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct VerificationKey(ed25519_consensus::VerificationKey);

impl VerificationKey {
    /// Converts a byte slice to a verification key.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not a valid encoding of an ed25519
    /// public key.
    pub(crate) fn try_from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let inner = ed25519_consensus::VerificationKey::try_from(bytes).map_err(|_| Error)?;
        Ok(Self(inner))
    }

    #[must_use]
    pub(crate) fn to_bytes(self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Checks that `signature` is valid over `message` under this key.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not verify.
    pub(crate) fn verify(&self, signature: &Signature, message: &[u8]) -> Result<(), Error> {
        self.0.verify(&signature.0, message).map_err(|_| Error)
    }

    #[must_use]
    pub(crate) fn address(&self) -> Address {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut inner = [0u8; ADDRESS_LEN];
        inner.copy_from_slice(&digest[..ADDRESS_LEN]);
        Address::new(inner)
    }
}

/// An ed25519 signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Signature(ed25519_consensus::Signature);

impl Signature {
    /// Converts a byte slice to a signature.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not 64 bytes.
    pub(crate) fn try_from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let inner = <[u8; 64]>::try_from(bytes).map_err(|_| Error)?;
        Ok(Self(ed25519_consensus::Signature::from(inner)))
    }

    #[must_use]
    pub(crate) fn to_bytes(self) -> [u8; 64] {
        self.0.to_bytes()
    }
}

/// An opaque failure verifying or constructing a key or signature.
///
/// Deliberately carries no information on why the input was rejected.
#[derive(Debug, thiserror::Error)]
#[error("invalid ed25519 key or signature")]
pub(crate) struct Error;

#[cfg(test)]
mod tests {
    use super::SigningKey;

    #[test]
    fn signatures_roundtrip_and_verify() {
        let key = SigningKey::from([42; 32]);
        let signature = key.sign(b"a message");
        key.verification_key()
            .verify(&signature, b"a message")
            .unwrap();
        key.verification_key()
            .verify(&signature, b"another message")
            .unwrap_err();
    }

    #[test]
    fn address_is_stable_across_key_reconstruction() {
        let key = SigningKey::from([42; 32]);
        let other = SigningKey::from([42; 32]);
        assert_eq!(key.address(), other.address());
    }
}
