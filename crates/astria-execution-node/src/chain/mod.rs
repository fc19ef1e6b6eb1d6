//! The embedded chain backend.
//!
//! The execution service drives its blockchain through three narrow seams:
//! a [`ChainStore`] holding blocks and the head/safe/final pointers, a
//! [`TxPool`] staging the sequencer-ordered transactions, and a
//! [`StateMachine`] turning payload attributes into executed blocks. The
//! in-memory reference implementations live in [`blockchain`] and
//! [`mempool`].

pub(crate) mod blockchain;
pub(crate) mod crypto;
pub(crate) mod genesis;
pub(crate) mod mempool;
pub(crate) mod transaction;

use std::sync::Arc;

use sha3::{
    Digest as _,
    Keccak256,
};

pub(crate) use self::transaction::Transaction;

pub(crate) const ADDRESS_LEN: usize = 20;

/// A 20 byte account address on the rollup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Address([u8; ADDRESS_LEN]);

impl Address {
    #[must_use]
    pub(crate) const fn new(inner: [u8; ADDRESS_LEN]) -> Self {
        Self(inner)
    }

    #[must_use]
    pub(crate) const fn get(self) -> [u8; ADDRESS_LEN] {
        self.0
    }

    /// Parses an address from a hex string, with or without a `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not hex or does not decode to 20
    /// bytes.
    pub(crate) fn try_from_hex(input: &str) -> Result<Self, AddressError> {
        let stripped = input.strip_prefix("0x").unwrap_or(input);
        let bytes = hex::decode(stripped).map_err(AddressError::Hex)?;
        let inner = <[u8; ADDRESS_LEN]>::try_from(bytes.as_slice())
            .map_err(|_| AddressError::IncorrectLength {
                received: bytes.len(),
            })?;
        Ok(Self(inner))
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum AddressError {
    #[error("address was not hex encoded")]
    Hex(#[source] hex::FromHexError),
    #[error("expected an address of 20 bytes, got `{received}`")]
    IncorrectLength { received: usize },
}

/// A rollup block header.
///
/// The block hash is the Keccak-256 digest of the header's canonical
/// encoding, a fixed width concatenation of all header fields.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Header {
    pub(crate) number: u64,
    pub(crate) parent_hash: [u8; 32],
    pub(crate) timestamp: u64,
    pub(crate) prev_randao: [u8; 32],
    pub(crate) state_root: [u8; 32],
    pub(crate) transactions_root: [u8; 32],
    pub(crate) fee_recipient: Address,
    pub(crate) gas_limit: u64,
    pub(crate) gas_used: u64,
    /// The hash of the sequencer block this block was derived from. Set for
    /// all blocks after the chain's Cancun activation.
    pub(crate) sequencer_block_hash: Option<[u8; 32]>,
}

impl Header {
    #[must_use]
    pub(crate) fn hash(&self) -> [u8; 32] {
        let mut hasher = Keccak256::new();
        hasher.update(self.number.to_be_bytes());
        hasher.update(self.parent_hash);
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update(self.prev_randao);
        hasher.update(self.state_root);
        hasher.update(self.transactions_root);
        hasher.update(self.fee_recipient.get());
        hasher.update(self.gas_limit.to_be_bytes());
        hasher.update(self.gas_used.to_be_bytes());
        match &self.sequencer_block_hash {
            Some(sequencer_block_hash) => {
                hasher.update([1]);
                hasher.update(sequencer_block_hash);
            }
            None => hasher.update([0]),
        }
        hasher.finalize().into()
    }
}

/// An executed rollup block.
///
/// The hash is computed once at construction; all blocks are immutable once
/// built.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Block {
    header: Header,
    transactions: Vec<Transaction>,
    hash: [u8; 32],
}

impl Block {
    #[must_use]
    pub(crate) fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        let hash = header.hash();
        Self {
            header,
            transactions,
            hash,
        }
    }

    #[must_use]
    pub(crate) fn header(&self) -> &Header {
        &self.header
    }

    #[must_use]
    pub(crate) fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    #[must_use]
    pub(crate) fn hash(&self) -> [u8; 32] {
        self.hash
    }

    #[must_use]
    pub(crate) fn number(&self) -> u64 {
        self.header.number
    }

    #[must_use]
    pub(crate) fn parent_hash(&self) -> [u8; 32] {
        self.header.parent_hash
    }
}

/// The attributes the payload builder derives a new block from.
///
/// `prev_randao` and `is_optimistic_execution` are carried for parity with
/// the engine API shape consumed by optimistic block building; the service
/// always passes a zeroed randao and `false`.
pub(crate) struct PayloadAttributes {
    pub(crate) parent: [u8; 32],
    pub(crate) timestamp: u64,
    pub(crate) prev_randao: [u8; 32],
    pub(crate) fee_recipient: Address,
    pub(crate) override_transactions: Vec<Transaction>,
    pub(crate) is_optimistic_execution: bool,
    pub(crate) sequencer_block_hash: Option<[u8; 32]>,
}

/// Immutable block storage plus the mutable head, safe, and final pointers.
pub(crate) trait ChainStore: Send + Sync {
    /// The header of the current head of the canonical chain.
    fn head_header(&self) -> Header;

    /// The header the safe (soft) pointer names, if set.
    fn safe_header(&self) -> Option<Header>;

    /// The header the final (firm) pointer names, if set.
    fn final_header(&self) -> Option<Header>;

    /// The base celestia height persisted alongside the final pointer.
    fn base_celestia_height(&self) -> u64;

    fn block_by_hash(&self, hash: &[u8; 32]) -> Option<Arc<Block>>;

    fn header_by_number(&self, number: u64) -> Option<Header>;

    fn header_by_hash(&self, hash: &[u8; 32]) -> Option<Header>;

    /// The hash of the canonical block at `number`, if the canonical chain
    /// reaches that height.
    fn canonical_hash_at(&self, number: u64) -> Option<[u8; 32]>;

    /// Validates and stores a block without advancing the head pointer.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is unknown or the block fails
    /// re-execution against the parent state.
    fn insert_block_without_set_head(&self, block: Arc<Block>) -> eyre::Result<()>;

    /// Reorganises the canonical chain so that `block` is the new head.
    ///
    /// # Errors
    ///
    /// Returns an error if `block` or any of its ancestors are not stored.
    fn set_canonical(&self, block: &Block) -> eyre::Result<()>;

    /// Moves the safe pointer to `header`.
    fn set_safe(&self, header: &Header);

    /// Moves the final pointer to `header` and persists `base_celestia_height`
    /// in the same atomic step.
    fn set_celestia_finalized(&self, header: &Header, base_celestia_height: u64);
}

/// The sequencer-ordered list of transactions consumed by the payload
/// builder.
pub(crate) trait TxPool: Send + Sync {
    /// Replaces the ordered list.
    fn set_ordered(&self, transactions: Vec<Transaction>);

    /// Returns a copy of the ordered list.
    fn ordered(&self) -> Vec<Transaction>;

    /// Drops the ordered list.
    fn clear_ordered(&self);

    /// The number of transactions currently staged.
    fn len(&self) -> usize;
}

/// The execution engine: turns payload attributes into an executed block.
pub(crate) trait StateMachine: Send + Sync {
    /// Builds and executes a block on top of `attributes.parent`.
    ///
    /// Transactions which fail signature, nonce, balance, or gas checks are
    /// silently dropped; a block is produced from whatever subset applies.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent block or its state are unknown.
    fn build_payload(&self, attributes: PayloadAttributes) -> eyre::Result<Arc<Block>>;

    /// Marks the engine as synced with the sequencer.
    fn set_synced(&self);
}

#[cfg(test)]
mod tests {
    use super::{
        Address,
        Header,
    };

    fn header() -> Header {
        Header {
            number: 1,
            parent_hash: [1; 32],
            timestamp: 1_700_000_000,
            prev_randao: [0; 32],
            state_root: [2; 32],
            transactions_root: [3; 32],
            fee_recipient: Address::new([4; 20]),
            gas_limit: 30_000_000,
            gas_used: 21_000,
            sequencer_block_hash: None,
        }
    }

    #[test]
    fn header_hash_commits_to_every_field() {
        let base = header().hash();

        let mut changed = header();
        changed.timestamp += 1;
        assert_ne!(base, changed.hash());

        let mut changed = header();
        changed.state_root = [5; 32];
        assert_ne!(base, changed.hash());

        let mut changed = header();
        changed.sequencer_block_hash = Some([0; 32]);
        assert_ne!(base, changed.hash());
    }

    #[test]
    fn address_hex_roundtrip() {
        let address = Address::new([42; 20]);
        let parsed = Address::try_from_hex(&address.to_string()).unwrap();
        assert_eq!(address, parsed);

        let parsed = Address::try_from_hex(&hex::encode([42; 20])).unwrap();
        assert_eq!(address, parsed);
    }

    #[test]
    fn malformed_hex_addresses_are_rejected() {
        Address::try_from_hex("0xnothex").unwrap_err();
        Address::try_from_hex("0xabcd").unwrap_err();
    }
}
