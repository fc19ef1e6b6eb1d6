//! The process-wide service state.
//!
//! One [`ServiceState`] is constructed at startup and shared by all request
//! handlers. It owns the handles to the chain collaborators, the two
//! serialisation locks, the rotating fee-recipient and auctioneer cells, and
//! the handshake flags which gate block execution and commitment updates.

use std::{
    collections::HashMap,
    sync::Arc,
};

use eyre::WrapErr as _;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    chain::{
        genesis::GenesisConfig,
        Address,
        ChainStore,
        StateMachine,
        TxPool,
    },
    unbundler::RollupDataUnbundler,
    validation::validate_bech32m_address,
};

pub(crate) struct ServiceState {
    chain: Arc<dyn ChainStore>,
    mempool: Arc<dyn TxPool>,
    state_machine: Arc<dyn StateMachine>,
    unbundler: RollupDataUnbundler,
    genesis: GenesisConfig,
    fee_collectors: HashMap<u32, Address>,

    execution_lock: Mutex<()>,
    commitment_lock: Mutex<()>,

    next_fee_recipient: RwLock<Address>,
    auctioneer_address: RwLock<String>,
    genesis_info_called: RwLock<bool>,
    commitment_state_called: RwLock<bool>,
}

impl ServiceState {
    /// Builds the service state from the chain collaborators and the genesis
    /// configuration.
    ///
    /// The next fee recipient and the auctioneer address are seeded from the
    /// entry configured at the greatest height at or below the upcoming
    /// block height.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured fee collector is not a valid hex
    /// address.
    pub(crate) fn new(
        chain: Arc<dyn ChainStore>,
        mempool: Arc<dyn TxPool>,
        state_machine: Arc<dyn StateMachine>,
        genesis: GenesisConfig,
    ) -> eyre::Result<Self> {
        let mut fee_collectors = HashMap::new();
        for (height, address) in &genesis.fee_collectors {
            let address = Address::try_from_hex(address).wrap_err_with(|| {
                format!("fee collector at height {height} is not a valid address")
            })?;
            fee_collectors.insert(*height, address);
        }

        let next_height = next_block_height(chain.as_ref());
        let next_fee_recipient = genesis
            .fee_collectors
            .range(..=next_height)
            .next_back()
            .map(|(height, _)| fee_collectors[height])
            .unwrap_or_default();

        let auctioneer_address = genesis
            .auctioneer_addresses
            .range(..=next_height)
            .next_back()
            .map(|(_, address)| address.clone())
            .unwrap_or_default();
        if !auctioneer_address.is_empty() {
            if let Err(error) =
                validate_bech32m_address(&auctioneer_address, &genesis.sequencer_address_prefix)
            {
                warn!(
                    %error,
                    address = auctioneer_address,
                    "configured auctioneer address is not a valid bech32m address",
                );
            }
        }

        let unbundler = RollupDataUnbundler::new(&genesis.bridge_address_configs);

        Ok(Self {
            chain,
            mempool,
            state_machine,
            unbundler,
            genesis,
            fee_collectors,
            execution_lock: Mutex::new(()),
            commitment_lock: Mutex::new(()),
            next_fee_recipient: RwLock::new(next_fee_recipient),
            auctioneer_address: RwLock::new(auctioneer_address),
            genesis_info_called: RwLock::new(false),
            commitment_state_called: RwLock::new(false),
        })
    }

    pub(crate) fn chain(&self) -> &dyn ChainStore {
        self.chain.as_ref()
    }

    pub(crate) fn mempool(&self) -> &dyn TxPool {
        self.mempool.as_ref()
    }

    pub(crate) fn state_machine(&self) -> &dyn StateMachine {
        self.state_machine.as_ref()
    }

    pub(crate) fn unbundler(&self) -> &RollupDataUnbundler {
        &self.unbundler
    }

    pub(crate) fn execution_lock(&self) -> &Mutex<()> {
        &self.execution_lock
    }

    pub(crate) fn commitment_lock(&self) -> &Mutex<()> {
        &self.commitment_lock
    }

    pub(crate) fn rollup_name(&self) -> &str {
        &self.genesis.rollup_name
    }

    pub(crate) fn sequencer_initial_height(&self) -> u32 {
        self.genesis.sequencer_initial_height
    }

    pub(crate) fn celestia_height_variance(&self) -> u64 {
        self.genesis.celestia_height_variance
    }

    pub(crate) fn sequencer_address_prefix(&self) -> &str {
        &self.genesis.sequencer_address_prefix
    }

    pub(crate) fn is_cancun(&self, number: u64, timestamp: u64) -> bool {
        self.genesis.is_cancun(number, timestamp)
    }

    /// The fee collector configured at exactly `height`, if any.
    pub(crate) fn fee_collector_at(&self, height: u32) -> Option<Address> {
        self.fee_collectors.get(&height).copied()
    }

    /// The auctioneer address configured at exactly `height`, if any.
    pub(crate) fn auctioneer_address_at(&self, height: u32) -> Option<&str> {
        self.genesis
            .auctioneer_addresses
            .get(&height)
            .map(String::as_str)
    }

    pub(crate) fn next_fee_recipient(&self) -> Address {
        *self.next_fee_recipient.read()
    }

    pub(crate) fn set_next_fee_recipient(&self, next_fee_recipient: Address) {
        *self.next_fee_recipient.write() = next_fee_recipient;
    }

    pub(crate) fn auctioneer_address(&self) -> String {
        self.auctioneer_address.read().clone()
    }

    pub(crate) fn set_auctioneer_address(&self, auctioneer_address: String) {
        *self.auctioneer_address.write() = auctioneer_address;
    }

    pub(crate) fn genesis_info_called(&self) -> bool {
        *self.genesis_info_called.read()
    }

    pub(crate) fn set_genesis_info_called(&self) {
        *self.genesis_info_called.write() = true;
    }

    pub(crate) fn commitment_state_called(&self) -> bool {
        *self.commitment_state_called.read()
    }

    pub(crate) fn set_commitment_state_called(&self) {
        *self.commitment_state_called.write() = true;
    }

    /// Whether both handshake procedures have been called at least once.
    ///
    /// The flags latch true for the lifetime of the process.
    pub(crate) fn sync_methods_called(&self) -> bool {
        self.genesis_info_called() && self.commitment_state_called()
    }
}

fn next_block_height(chain: &dyn ChainStore) -> u32 {
    u32::try_from(chain.head_header().number.saturating_add(1)).unwrap_or(u32::MAX)
}
