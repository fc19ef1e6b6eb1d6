//! Shared setup for the service tests: a funded test key, a genesis
//! configuration with a registered bridge account, and a helper generating a
//! chain of empty blocks with the commitment pointers at its head.

use std::{
    collections::BTreeMap,
    sync::Arc,
};

use crate::{
    chain::{
        blockchain::Blockchain,
        crypto::SigningKey,
        genesis::{
            BridgeAddressConfig,
            GenesisAccount,
            GenesisConfig,
        },
        mempool::Mempool,
        Address,
        ChainStore as _,
        PayloadAttributes,
        StateMachine as _,
    },
    execution_service::Server,
    metrics::Metrics,
    state::ServiceState,
};

pub(crate) const GENESIS_TIMESTAMP: u64 = 1_690_000_000;
pub(crate) const SEQUENCER_INITIAL_HEIGHT: u32 = 10;
pub(crate) const CELESTIA_INITIAL_HEIGHT: u64 = 5;
pub(crate) const CELESTIA_HEIGHT_VARIANCE: u64 = 100;
pub(crate) const ADDRESS_PREFIX: &str = "astria";
pub(crate) const ASSET_DENOM: &str = "nria";
pub(crate) const GAS_LIMIT: u64 = 30_000_000;
pub(crate) const FUNDS: u128 = 10_000_000_000_000_000_000;

pub(crate) fn funded_signing_key() -> SigningKey {
    SigningKey::from([1; 32])
}

pub(crate) fn fee_collector_address() -> Address {
    Address::new([0xfe; 20])
}

pub(crate) fn bridge_address() -> String {
    encode_bech32m(ADDRESS_PREFIX, [0xbb; 20])
}

pub(crate) fn auctioneer_address() -> String {
    encode_bech32m(ADDRESS_PREFIX, [0xaa; 20])
}

pub(crate) fn encode_bech32m(prefix: &str, bytes: [u8; 20]) -> String {
    bech32::encode_lower::<bech32::Bech32m>(bech32::Hrp::parse(prefix).unwrap(), &bytes).unwrap()
}

pub(crate) fn genesis_config() -> GenesisConfig {
    GenesisConfig {
        rollup_name: "test".to_string(),
        sequencer_initial_height: SEQUENCER_INITIAL_HEIGHT,
        celestia_initial_height: CELESTIA_INITIAL_HEIGHT,
        celestia_height_variance: CELESTIA_HEIGHT_VARIANCE,
        sequencer_address_prefix: ADDRESS_PREFIX.to_string(),
        bridge_address_configs: vec![BridgeAddressConfig {
            bridge_address: bridge_address(),
            asset_denom: ASSET_DENOM.to_string(),
        }],
        fee_collectors: BTreeMap::from([(1, fee_collector_address().to_string())]),
        auctioneer_addresses: BTreeMap::from([(1, auctioneer_address())]),
        cancun_time: None,
        gas_limit: GAS_LIMIT,
        timestamp: GENESIS_TIMESTAMP,
        alloc: BTreeMap::from([(
            funded_signing_key().address().to_string(),
            GenesisAccount {
                balance: FUNDS,
            },
        )]),
    }
}

pub(crate) struct TestService {
    pub(crate) chain: Arc<Blockchain>,
    pub(crate) mempool: Arc<Mempool>,
    pub(crate) state: Arc<ServiceState>,
    pub(crate) server: Arc<Server>,
}

/// Builds a service whose chain holds `blocks_to_generate` empty blocks on
/// top of genesis, with the head, safe, and final pointers all at the last
/// generated block.
pub(crate) fn setup_service(blocks_to_generate: u64) -> TestService {
    setup_service_with_genesis(genesis_config(), blocks_to_generate)
}

pub(crate) fn setup_service_with_genesis(
    genesis: GenesisConfig,
    blocks_to_generate: u64,
) -> TestService {
    let mempool = Arc::new(Mempool::new());
    let chain = Arc::new(
        Blockchain::from_genesis(&genesis, mempool.clone()).expect("genesis config must be valid"),
    );

    for _ in 0..blocks_to_generate {
        let head = chain.head_header();
        let block = chain
            .build_payload(PayloadAttributes {
                parent: head.hash(),
                timestamp: head.timestamp + 2,
                prev_randao: [0; 32],
                fee_recipient: fee_collector_address(),
                override_transactions: Vec::new(),
                is_optimistic_execution: false,
                sequencer_block_hash: None,
            })
            .expect("building an empty block on the head must succeed");
        chain
            .insert_block_without_set_head(block.clone())
            .expect("inserting a freshly built block must succeed");
        chain
            .set_canonical(&block)
            .expect("a freshly inserted block can be made canonical");
    }

    let head = chain.head_header();
    chain.set_safe(&head);
    chain.set_celestia_finalized(&head, genesis.celestia_initial_height);

    let state = Arc::new(
        ServiceState::new(chain.clone(), mempool.clone(), chain.clone(), genesis)
            .expect("the test genesis config must produce a valid service state"),
    );
    let metrics = Box::leak(Box::new(Metrics::new()));
    let server = Arc::new(Server::new(state.clone(), metrics));

    TestService {
        chain,
        mempool,
        state,
        server,
    }
}
