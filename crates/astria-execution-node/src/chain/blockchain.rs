//! An in-memory blockchain with per-block state snapshots.
//!
//! Implements both seams the execution service drives: [`ChainStore`] for
//! storage and pointer management, and [`StateMachine`] for payload
//! building. Forks are first class: blocks are inserted without moving the
//! head, and [`ChainStore::set_canonical`] reorganises the
//! canonical-by-height index to any stored block.

use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        Arc,
    },
};

use eyre::{
    ensure,
    OptionExt as _,
    WrapErr as _,
};
use parking_lot::RwLock;
use sha3::{
    Digest as _,
    Keccak256,
};
use tracing::debug;

use super::{
    genesis::GenesisConfig,
    mempool::Mempool,
    transaction::TRANSFER_GAS,
    Address,
    Block,
    ChainStore,
    Header,
    PayloadAttributes,
    StateMachine,
    Transaction,
    TxPool as _,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Account {
    pub(crate) balance: u128,
    pub(crate) nonce: u64,
}

/// The full account state after executing some block.
///
/// A `BTreeMap` so that iteration order, and with it the state root, is
/// deterministic.
type AccountState = BTreeMap<Address, Account>;

struct ChainInner {
    blocks: HashMap<[u8; 32], Arc<Block>>,
    states: HashMap<[u8; 32], AccountState>,
    canonical: BTreeMap<u64, [u8; 32]>,
    head: [u8; 32],
    safe: [u8; 32],
    finalized: [u8; 32],
    base_celestia_height: u64,
}

pub(crate) struct Blockchain {
    inner: RwLock<ChainInner>,
    mempool: Arc<Mempool>,
    gas_limit: u64,
    synced: AtomicBool,
}

impl Blockchain {
    /// Creates a chain holding only the genesis block derived from `genesis`,
    /// with all three pointers at genesis.
    ///
    /// # Errors
    ///
    /// Returns an error if an account key in the genesis alloc is not a hex
    /// encoded 20 byte address.
    pub(crate) fn from_genesis(
        genesis: &GenesisConfig,
        mempool: Arc<Mempool>,
    ) -> eyre::Result<Self> {
        let mut state = AccountState::new();
        for (address, account) in &genesis.alloc {
            let address = Address::try_from_hex(address)
                .wrap_err_with(|| format!("invalid address `{address}` in genesis alloc"))?;
            state.insert(
                address,
                Account {
                    balance: account.balance,
                    nonce: 0,
                },
            );
        }

        let header = Header {
            number: 0,
            parent_hash: [0; 32],
            timestamp: genesis.timestamp,
            prev_randao: [0; 32],
            state_root: state_root(&state),
            transactions_root: transactions_root(&[]),
            fee_recipient: Address::default(),
            gas_limit: genesis.gas_limit,
            gas_used: 0,
            sequencer_block_hash: None,
        };
        let block = Arc::new(Block::new(header, Vec::new()));
        let hash = block.hash();

        Ok(Self {
            inner: RwLock::new(ChainInner {
                blocks: HashMap::from([(hash, block)]),
                states: HashMap::from([(hash, state)]),
                canonical: BTreeMap::from([(0, hash)]),
                head: hash,
                safe: hash,
                finalized: hash,
                base_celestia_height: genesis.celestia_initial_height,
            }),
            mempool,
            gas_limit: genesis.gas_limit,
            synced: AtomicBool::new(false),
        })
    }

    /// The balance of `address` in the state of the current head block.
    #[must_use]
    pub(crate) fn balance_of(&self, address: &Address) -> u128 {
        let inner = self.inner.read();
        inner
            .states
            .get(&inner.head)
            .and_then(|state| state.get(address))
            .map_or(0, |account| account.balance)
    }

    #[must_use]
    pub(crate) fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Relaxed)
    }
}

impl ChainStore for Blockchain {
    fn head_header(&self) -> Header {
        let inner = self.inner.read();
        inner
            .blocks
            .get(&inner.head)
            .expect("the head pointer always names a stored block")
            .header()
            .clone()
    }

    fn safe_header(&self) -> Option<Header> {
        let inner = self.inner.read();
        inner
            .blocks
            .get(&inner.safe)
            .map(|block| block.header().clone())
    }

    fn final_header(&self) -> Option<Header> {
        let inner = self.inner.read();
        inner
            .blocks
            .get(&inner.finalized)
            .map(|block| block.header().clone())
    }

    fn base_celestia_height(&self) -> u64 {
        self.inner.read().base_celestia_height
    }

    fn block_by_hash(&self, hash: &[u8; 32]) -> Option<Arc<Block>> {
        self.inner.read().blocks.get(hash).cloned()
    }

    fn header_by_number(&self, number: u64) -> Option<Header> {
        let inner = self.inner.read();
        let hash = inner.canonical.get(&number)?;
        inner.blocks.get(hash).map(|block| block.header().clone())
    }

    fn header_by_hash(&self, hash: &[u8; 32]) -> Option<Header> {
        self.inner
            .read()
            .blocks
            .get(hash)
            .map(|block| block.header().clone())
    }

    fn canonical_hash_at(&self, number: u64) -> Option<[u8; 32]> {
        self.inner.read().canonical.get(&number).copied()
    }

    fn insert_block_without_set_head(&self, block: Arc<Block>) -> eyre::Result<()> {
        let mut inner = self.inner.write();
        let hash = block.hash();
        if inner.blocks.contains_key(&hash) {
            return Ok(());
        }
        let parent = inner
            .blocks
            .get(&block.parent_hash())
            .ok_or_eyre("parent block not found")?;
        ensure!(
            block.number() == parent.number().wrapping_add(1),
            "block number is not one above its parent's",
        );
        let mut state = inner
            .states
            .get(&block.parent_hash())
            .cloned()
            .ok_or_eyre("no state stored for parent block")?;

        let header = block.header();
        let mut gas_used = 0u64;
        for transaction in block.transactions() {
            let gas = apply_transaction(
                &mut state,
                transaction,
                header.fee_recipient,
                header.gas_limit.saturating_sub(gas_used),
            )
            .wrap_err("block contains an inapplicable transaction")?;
            gas_used = gas_used.saturating_add(gas);
        }
        ensure!(
            gas_used == header.gas_used,
            "gas used after re-execution does not match the header",
        );
        ensure!(
            state_root(&state) == header.state_root,
            "state root after re-execution does not match the header",
        );

        inner.blocks.insert(hash, block);
        inner.states.insert(hash, state);
        Ok(())
    }

    fn set_canonical(&self, block: &Block) -> eyre::Result<()> {
        let mut inner = self.inner.write();
        let head = block.hash();
        ensure!(
            inner.blocks.contains_key(&head),
            "cannot reorganise to a block that is not stored",
        );

        let mut canonical = BTreeMap::new();
        let mut cursor = Some((block.number(), head));
        while let Some((number, hash)) = cursor {
            let stored = inner
                .blocks
                .get(&hash)
                .ok_or_eyre("missing ancestor while reorganising the canonical chain")?;
            ensure!(
                stored.number() == number,
                "ancestor numbering is inconsistent",
            );
            canonical.insert(number, hash);
            cursor = number
                .checked_sub(1)
                .map(|parent_number| (parent_number, stored.parent_hash()));
        }

        inner.canonical = canonical;
        inner.head = head;
        Ok(())
    }

    fn set_safe(&self, header: &Header) {
        self.inner.write().safe = header.hash();
    }

    fn set_celestia_finalized(&self, header: &Header, base_celestia_height: u64) {
        let mut inner = self.inner.write();
        inner.finalized = header.hash();
        inner.base_celestia_height = base_celestia_height;
    }
}

impl StateMachine for Blockchain {
    fn build_payload(&self, attributes: PayloadAttributes) -> eyre::Result<Arc<Block>> {
        let PayloadAttributes {
            parent,
            timestamp,
            prev_randao,
            fee_recipient,
            override_transactions,
            is_optimistic_execution,
            sequencer_block_hash,
        } = attributes;
        ensure!(
            !is_optimistic_execution,
            "optimistic execution is not supported",
        );

        let (parent_number, mut state) = {
            let inner = self.inner.read();
            let parent_block = inner
                .blocks
                .get(&parent)
                .ok_or_eyre("parent block not found")?;
            let state = inner
                .states
                .get(&parent)
                .cloned()
                .ok_or_eyre("no state stored for parent block")?;
            (parent_block.number(), state)
        };

        let transactions = if override_transactions.is_empty() {
            self.mempool.ordered()
        } else {
            override_transactions
        };

        let mut included = Vec::with_capacity(transactions.len());
        let mut gas_used = 0u64;
        for transaction in transactions {
            match apply_transaction(
                &mut state,
                &transaction,
                fee_recipient,
                self.gas_limit.saturating_sub(gas_used),
            ) {
                Ok(gas) => {
                    gas_used = gas_used.saturating_add(gas);
                    included.push(transaction);
                }
                Err(reason) => debug!(%reason, "dropping transaction from payload"),
            }
        }

        let header = Header {
            number: parent_number.wrapping_add(1),
            parent_hash: parent,
            timestamp,
            prev_randao,
            state_root: state_root(&state),
            transactions_root: transactions_root(&included),
            fee_recipient,
            gas_limit: self.gas_limit,
            gas_used,
            sequencer_block_hash,
        };
        Ok(Arc::new(Block::new(header, included)))
    }

    fn set_synced(&self) {
        self.synced.store(true, Ordering::Relaxed);
    }
}

/// Applies `transaction` to `state`, returning the gas it consumed.
///
/// Deposits always apply and consume no gas. Sequenced transactions are
/// checked for signature validity, remaining block gas, nonce order, and
/// balance; the sender is debited value plus fee, the fee is credited to
/// `fee_recipient`.
fn apply_transaction(
    state: &mut AccountState,
    transaction: &Transaction,
    fee_recipient: Address,
    gas_remaining: u64,
) -> Result<u64, InvalidTransaction> {
    match transaction {
        Transaction::Deposit(deposit) => {
            credit(state, deposit.destination, deposit.amount);
            Ok(0)
        }
        Transaction::Sequenced(transaction) => {
            if !transaction.is_signature_valid() {
                return Err(InvalidTransaction::Signature);
            }
            if transaction.gas_limit() < TRANSFER_GAS {
                return Err(InvalidTransaction::IntrinsicGas {
                    gas_limit: transaction.gas_limit(),
                });
            }
            if transaction.gas_limit() > gas_remaining {
                return Err(InvalidTransaction::BlockGasExceeded {
                    gas_limit: transaction.gas_limit(),
                    gas_remaining,
                });
            }
            let sender = transaction.sender();
            let account = state.get(&sender).copied().unwrap_or_default();
            if transaction.nonce() != account.nonce {
                return Err(InvalidTransaction::Nonce {
                    expected: account.nonce,
                    got: transaction.nonce(),
                });
            }
            let cost = transaction.cost().ok_or(InvalidTransaction::CostOverflow)?;
            if account.balance < cost {
                return Err(InvalidTransaction::InsufficientBalance {
                    balance: account.balance,
                    cost,
                });
            }

            let fee = u128::from(TRANSFER_GAS).saturating_mul(transaction.max_fee_per_gas().into());
            let sender_account = state.entry(sender).or_default();
            sender_account.balance -= transaction.value() + fee;
            sender_account.nonce += 1;
            credit(state, transaction.to(), transaction.value());
            credit(state, fee_recipient, fee);
            Ok(TRANSFER_GAS)
        }
    }
}

fn credit(state: &mut AccountState, address: Address, amount: u128) {
    let account = state.entry(address).or_default();
    account.balance = account.balance.saturating_add(amount);
}

fn state_root(state: &AccountState) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for (address, account) in state {
        hasher.update(address.get());
        hasher.update(account.balance.to_be_bytes());
        hasher.update(account.nonce.to_be_bytes());
    }
    hasher.finalize().into()
}

fn transactions_root(transactions: &[Transaction]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for transaction in transactions {
        hasher.update(transaction.hash());
    }
    hasher.finalize().into()
}

#[derive(Debug, thiserror::Error)]
enum InvalidTransaction {
    #[error("signature verification failed")]
    Signature,
    #[error("gas limit {gas_limit} is below the intrinsic transfer gas")]
    IntrinsicGas { gas_limit: u64 },
    #[error("gas limit {gas_limit} exceeds the remaining block gas {gas_remaining}")]
    BlockGasExceeded { gas_limit: u64, gas_remaining: u64 },
    #[error("expected nonce {expected}, got {got}")]
    Nonce { expected: u64, got: u64 },
    #[error("sender balance {balance} cannot cover the maximum cost {cost}")]
    InsufficientBalance { balance: u128, cost: u128 },
    #[error("the maximum transaction cost overflows")]
    CostOverflow,
}
