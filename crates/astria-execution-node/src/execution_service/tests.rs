use astria_execution_api::{
    generated::astria::{
        execution::v1 as raw,
        sequencerblock::v1 as raw_sequencerblock,
    },
    primitive::v1::{
        RollupId,
        TransactionId,
    },
    sequencerblock::v1::{
        Deposit,
        RollupData,
    },
};
use bytes::Bytes;
use pbjson_types::Timestamp;
use sha2::{
    Digest as _,
    Sha256,
};
use tonic::{
    Code,
    Request,
};

use super::ExecutionService as _;
use crate::{
    chain::{
        transaction::SignedTransaction,
        Address,
        ChainStore as _,
        PayloadAttributes,
        StateMachine as _,
        TxPool as _,
    },
    test_utils::{
        auctioneer_address,
        bridge_address,
        encode_bech32m,
        fee_collector_address,
        funded_signing_key,
        genesis_config,
        setup_service,
        setup_service_with_genesis,
        TestService,
        ADDRESS_PREFIX,
        ASSET_DENOM,
        CELESTIA_HEIGHT_VARIANCE,
        CELESTIA_INITIAL_HEIGHT,
        GAS_LIMIT,
        SEQUENCER_INITIAL_HEIGHT,
    },
};

const RECIPIENT: Address = Address::new([2; 20]);
const ONE_NRIA: u128 = 1_000_000_000_000_000_000;

async fn handshake(service: &TestService) -> (raw::GenesisInfo, raw::CommitmentState) {
    let genesis_info = service
        .server
        .clone()
        .get_genesis_info(Request::new(raw::GetGenesisInfoRequest {}))
        .await
        .expect("GetGenesisInfo must succeed")
        .into_inner();
    let commitment_state = service
        .server
        .clone()
        .get_commitment_state(Request::new(raw::GetCommitmentStateRequest {}))
        .await
        .expect("GetCommitmentState must succeed")
        .into_inner();
    (genesis_info, commitment_state)
}

fn signed_transfers(count: u64) -> Vec<raw_sequencerblock::RollupData> {
    let key = funded_signing_key();
    (0..count)
        .map(|nonce| {
            let transaction = SignedTransaction::sign(nonce, RECIPIENT, 1, 21_000, 2, &key);
            RollupData::SequencedData(transaction.to_bytes().into()).into_raw()
        })
        .collect()
}

fn deposit_item(
    genesis_info: &raw::GenesisInfo,
    destination: Address,
    amount: u128,
) -> raw_sequencerblock::RollupData {
    RollupData::Deposit(Box::new(Deposit {
        bridge_address: bridge_address(),
        rollup_id: RollupId::try_from_raw(genesis_info.rollup_id.as_ref().unwrap()).unwrap(),
        amount,
        asset: ASSET_DENOM.to_string(),
        destination_chain_address: destination.to_string(),
        source_transaction_id: TransactionId::new("test_tx_hash".to_string()),
        source_action_index: 0,
    }))
    .into_raw()
}

fn execute_block_request(
    service: &TestService,
    transactions: Vec<raw_sequencerblock::RollupData>,
) -> raw::ExecuteBlockRequest {
    let soft = service
        .chain
        .safe_header()
        .expect("the test chain always has a safe block");
    raw::ExecuteBlockRequest {
        prev_block_hash: Bytes::copy_from_slice(&soft.hash()),
        transactions,
        timestamp: Some(Timestamp {
            seconds: i64::try_from(soft.timestamp + 2).unwrap(),
            nanos: 0,
        }),
        sequencer_block_hash: None,
    }
}

fn update_commitment_state_request(
    block: &raw::Block,
    base_celestia_height: u64,
) -> raw::UpdateCommitmentStateRequest {
    raw::UpdateCommitmentStateRequest {
        commitment_state: Some(raw::CommitmentState {
            soft: Some(block.clone()),
            firm: Some(block.clone()),
            base_celestia_height,
        }),
    }
}

#[tokio::test]
async fn get_genesis_info_returns_the_rollup_identity() {
    let service = setup_service(10);
    let genesis_info = service
        .server
        .clone()
        .get_genesis_info(Request::new(raw::GetGenesisInfoRequest {}))
        .await
        .unwrap()
        .into_inner();

    let hashed_rollup_name: [u8; 32] = Sha256::digest("test").into();
    assert_eq!(
        hashed_rollup_name.as_slice(),
        genesis_info.rollup_id.unwrap().inner.as_ref(),
    );
    assert_eq!(
        SEQUENCER_INITIAL_HEIGHT,
        genesis_info.sequencer_genesis_block_height,
    );
    assert_eq!(CELESTIA_HEIGHT_VARIANCE, genesis_info.celestia_block_variance);
    assert!(service.state.genesis_info_called());
}

#[tokio::test]
async fn get_commitment_state_returns_the_current_pointers() {
    let service = setup_service(10);
    let commitment_state = service
        .server
        .clone()
        .get_commitment_state(Request::new(raw::GetCommitmentStateRequest {}))
        .await
        .unwrap()
        .into_inner();

    let head = service.chain.head_header();
    assert_eq!(10, head.number);

    let soft = commitment_state.soft.unwrap();
    assert_eq!(head.hash().as_slice(), soft.hash.as_ref());
    assert_eq!(head.parent_hash.as_slice(), soft.parent_block_hash.as_ref());
    assert_eq!(10, soft.number);

    let firm = commitment_state.firm.unwrap();
    assert_eq!(head.hash().as_slice(), firm.hash.as_ref());
    assert_eq!(10, firm.number);

    assert_eq!(CELESTIA_INITIAL_HEIGHT, commitment_state.base_celestia_height);
    assert!(service.state.commitment_state_called());
}

#[tokio::test]
async fn get_block_returns_blocks_by_number_and_by_hash() {
    let service = setup_service(10);

    let by_number = service
        .server
        .clone()
        .get_block(Request::new(raw::GetBlockRequest {
            identifier: Some(raw::BlockIdentifier {
                identifier: Some(raw::block_identifier::Identifier::BlockNumber(1)),
            }),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(1, by_number.number);

    let block_four = service.chain.header_by_number(4).unwrap();
    let by_hash = service
        .server
        .clone()
        .get_block(Request::new(raw::GetBlockRequest {
            identifier: Some(raw::BlockIdentifier {
                identifier: Some(raw::block_identifier::Identifier::BlockHash(
                    Bytes::copy_from_slice(&block_four.hash()),
                )),
            }),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(4, by_hash.number);
    assert_eq!(block_four.parent_hash.as_slice(), by_hash.parent_block_hash.as_ref());

    // a block fetched by number and re-fetched by the returned hash is equal
    let roundtripped = service
        .server
        .clone()
        .get_block(Request::new(raw::GetBlockRequest {
            identifier: Some(raw::BlockIdentifier {
                identifier: Some(raw::block_identifier::Identifier::BlockHash(
                    by_number.hash.clone(),
                )),
            }),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(by_number, roundtripped);
}

#[tokio::test]
async fn get_block_of_unknown_number_is_not_found() {
    let service = setup_service(10);
    let status = service
        .server
        .clone()
        .get_block(Request::new(raw::GetBlockRequest {
            identifier: Some(raw::BlockIdentifier {
                identifier: Some(raw::block_identifier::Identifier::BlockNumber(100)),
            }),
        }))
        .await
        .unwrap_err();
    assert_eq!(Code::NotFound, status.code());
}

#[tokio::test]
async fn get_block_without_identifier_is_rejected() {
    let service = setup_service(10);
    let status = service
        .server
        .clone()
        .get_block(Request::new(raw::GetBlockRequest {
            identifier: None,
        }))
        .await
        .unwrap_err();
    assert_eq!(Code::InvalidArgument, status.code());
}

#[tokio::test]
async fn batch_get_blocks_returns_all_requested_blocks_in_order() {
    let service = setup_service(10);

    let by_numbers = service
        .server
        .clone()
        .batch_get_blocks(Request::new(raw::BatchGetBlocksRequest {
            identifiers: (1..=5)
                .map(|number| raw::BlockIdentifier {
                    identifier: Some(raw::block_identifier::Identifier::BlockNumber(number)),
                })
                .collect(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(
        vec![1, 2, 3, 4, 5],
        by_numbers
            .blocks
            .iter()
            .map(|block| block.number)
            .collect::<Vec<_>>(),
    );

    let by_hashes = service
        .server
        .clone()
        .batch_get_blocks(Request::new(raw::BatchGetBlocksRequest {
            identifiers: by_numbers
                .blocks
                .iter()
                .map(|block| raw::BlockIdentifier {
                    identifier: Some(raw::block_identifier::Identifier::BlockHash(
                        block.hash.clone(),
                    )),
                })
                .collect(),
        }))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(by_numbers.blocks, by_hashes.blocks);
}

#[tokio::test]
async fn batch_get_blocks_fails_on_the_first_missing_block() {
    let service = setup_service(10);
    let status = service
        .server
        .clone()
        .batch_get_blocks(Request::new(raw::BatchGetBlocksRequest {
            identifiers: [1, 2, 3, 4, 100]
                .into_iter()
                .map(|number| raw::BlockIdentifier {
                    identifier: Some(raw::block_identifier::Identifier::BlockNumber(number)),
                })
                .collect(),
        }))
        .await
        .unwrap_err();
    assert_eq!(Code::NotFound, status.code());
}

#[tokio::test]
async fn batch_get_blocks_with_empty_identifiers_is_rejected() {
    let service = setup_service(10);
    let status = service
        .server
        .clone()
        .batch_get_blocks(Request::new(raw::BatchGetBlocksRequest {
            identifiers: Vec::new(),
        }))
        .await
        .unwrap_err();
    assert_eq!(Code::InvalidArgument, status.code());
}

#[tokio::test]
async fn execute_block_before_handshake_is_permission_denied() {
    let service = setup_service(10);
    let request = execute_block_request(&service, signed_transfers(5));
    let status = service
        .server
        .clone()
        .execute_block(Request::new(request))
        .await
        .unwrap_err();
    assert_eq!(Code::PermissionDenied, status.code());
}

#[tokio::test]
async fn execute_block_after_partial_handshake_is_permission_denied() {
    let service = setup_service(10);
    service
        .server
        .clone()
        .get_genesis_info(Request::new(raw::GetGenesisInfoRequest {}))
        .await
        .unwrap();
    let request = execute_block_request(&service, signed_transfers(5));
    let status = service
        .server
        .clone()
        .execute_block(Request::new(request))
        .await
        .unwrap_err();
    assert_eq!(Code::PermissionDenied, status.code());
}

#[tokio::test]
async fn execute_block_on_a_stale_parent_is_failed_precondition() {
    let service = setup_service(10);
    handshake(&service).await;

    let stale_parent = service.chain.header_by_number(2).unwrap();
    let request = raw::ExecuteBlockRequest {
        prev_block_hash: Bytes::copy_from_slice(&stale_parent.hash()),
        transactions: signed_transfers(5),
        timestamp: Some(Timestamp {
            seconds: i64::try_from(stale_parent.timestamp + 2).unwrap(),
            nanos: 0,
        }),
        sequencer_block_hash: None,
    };
    let status = service
        .server
        .clone()
        .execute_block(Request::new(request))
        .await
        .unwrap_err();
    assert_eq!(Code::FailedPrecondition, status.code());
}

#[tokio::test]
async fn execute_block_with_malformed_request_is_invalid_argument() {
    let service = setup_service(10);
    handshake(&service).await;

    let mut request = execute_block_request(&service, signed_transfers(5));
    request.prev_block_hash = Bytes::from_static(&[1; 16]);
    let status = service
        .server
        .clone()
        .execute_block(Request::new(request))
        .await
        .unwrap_err();
    assert_eq!(Code::InvalidArgument, status.code());
}

#[tokio::test]
async fn execute_block_builds_on_the_soft_head_without_advancing_commitments() {
    let service = setup_service(10);
    let (_, commitment_before) = handshake(&service).await;

    let request = execute_block_request(&service, signed_transfers(5));
    let executed = service
        .server
        .clone()
        .execute_block(Request::new(request.clone()))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(11, executed.number);
    assert_eq!(request.prev_block_hash, executed.parent_block_hash);
    // the ordered transactions are cleared after the block is built
    assert_eq!(0, service.mempool.len());
    // the head pointer is not advanced by execution
    assert_eq!(10, service.chain.head_header().number);

    let commitment_after = service
        .server
        .clone()
        .get_commitment_state(Request::new(raw::GetCommitmentStateRequest {}))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(commitment_before, commitment_after);
}

#[tokio::test]
async fn execute_block_and_update_commitment_state_credits_deposits() {
    let service = setup_service(10);
    let (genesis_info, commitment_state) = handshake(&service).await;

    let destination = Address::new([0xd0; 20]);
    let balance_before = service.chain.balance_of(&destination);

    let mut transactions = signed_transfers(5);
    transactions.push(deposit_item(&genesis_info, destination, ONE_NRIA));

    let executed = service
        .server
        .clone()
        .execute_block(Request::new(execute_block_request(&service, transactions)))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(0, service.mempool.len());

    let update = update_commitment_state_request(
        &executed,
        commitment_state.base_celestia_height + 1,
    );
    let updated = service
        .server
        .clone()
        .update_commitment_state(Request::new(update.clone()))
        .await
        .unwrap()
        .into_inner();
    // the response echoes the requested state unchanged
    assert_eq!(update.commitment_state.unwrap(), updated);

    let soft = service.chain.safe_header().unwrap();
    assert_eq!(soft.hash().as_slice(), updated.soft.as_ref().unwrap().hash.as_ref());
    let firm = service.chain.final_header().unwrap();
    assert_eq!(firm.hash().as_slice(), updated.firm.as_ref().unwrap().hash.as_ref());
    assert_eq!(
        commitment_state.base_celestia_height + 1,
        service.chain.base_celestia_height(),
    );
    assert!(service.chain.is_synced());

    // reading the state back returns what was set
    let fetched = service
        .server
        .clone()
        .get_commitment_state(Request::new(raw::GetCommitmentStateRequest {}))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(updated, fetched);

    let balance_after = service.chain.balance_of(&destination);
    assert_eq!(ONE_NRIA, balance_after - balance_before);
}

#[tokio::test]
async fn oversized_transaction_is_dropped_from_the_block() {
    let service = setup_service(10);
    let (_, commitment_state) = handshake(&service).await;

    let mut transactions = signed_transfers(5);
    // gas equal to the whole block gas limit no longer fits after the
    // transfers above
    let oversized = SignedTransaction::sign(5, RECIPIENT, 1, GAS_LIMIT, 2, &funded_signing_key());
    transactions.push(RollupData::SequencedData(oversized.to_bytes().into()).into_raw());

    let executed = service
        .server
        .clone()
        .execute_block(Request::new(execute_block_request(&service, transactions)))
        .await
        .unwrap()
        .into_inner();

    service
        .server
        .clone()
        .update_commitment_state(Request::new(update_commitment_state_request(
            &executed,
            commitment_state.base_celestia_height + 1,
        )))
        .await
        .unwrap();

    let hash: [u8; 32] = executed.hash.as_ref().try_into().unwrap();
    let block = service.chain.block_by_hash(&hash).unwrap();
    assert_eq!(5, block.transactions().len());
}

#[tokio::test]
async fn update_commitment_state_before_handshake_is_permission_denied() {
    let service = setup_service(10);
    let head = service.chain.head_header();
    let head_block = raw::Block {
        number: u32::try_from(head.number).unwrap(),
        hash: Bytes::copy_from_slice(&head.hash()),
        parent_block_hash: Bytes::copy_from_slice(&head.parent_hash),
        timestamp: Some(Timestamp {
            seconds: i64::try_from(head.timestamp).unwrap(),
            nanos: 0,
        }),
    };
    let status = service
        .server
        .clone()
        .update_commitment_state(Request::new(update_commitment_state_request(
            &head_block,
            CELESTIA_INITIAL_HEIGHT,
        )))
        .await
        .unwrap_err();
    assert_eq!(Code::PermissionDenied, status.code());
}

#[tokio::test]
async fn update_commitment_state_rejects_decreasing_celestia_height() {
    let service = setup_service(10);
    let (_, commitment_state) = handshake(&service).await;

    let status = service
        .server
        .clone()
        .update_commitment_state(Request::new(raw::UpdateCommitmentStateRequest {
            commitment_state: Some(raw::CommitmentState {
                base_celestia_height: commitment_state.base_celestia_height - 1,
                ..commitment_state
            }),
        }))
        .await
        .unwrap_err();
    assert_eq!(Code::InvalidArgument, status.code());
}

#[tokio::test]
async fn update_commitment_state_rejects_unknown_blocks() {
    let service = setup_service(10);
    let (_, commitment_state) = handshake(&service).await;

    let mut unknown = commitment_state.soft.clone().unwrap();
    unknown.hash = Bytes::from_static(&[0xab; 32]);
    let status = service
        .server
        .clone()
        .update_commitment_state(Request::new(update_commitment_state_request(
            &unknown,
            commitment_state.base_celestia_height,
        )))
        .await
        .unwrap_err();
    assert_eq!(Code::InvalidArgument, status.code());
}

#[tokio::test]
async fn update_commitment_state_rejects_firm_not_on_the_soft_chain() {
    let service = setup_service(10);
    handshake(&service).await;

    let original_head = service.chain.head_header();
    let soft = service.chain.safe_header().unwrap();

    let block_a = service
        .server
        .clone()
        .execute_block(Request::new(execute_block_request(
            &service,
            signed_transfers(5),
        )))
        .await
        .unwrap()
        .into_inner();

    // a sibling of block_a, inserted without moving the head
    let block_b = service
        .chain
        .build_payload(PayloadAttributes {
            parent: soft.hash(),
            timestamp: soft.timestamp + 4,
            prev_randao: [0; 32],
            fee_recipient: fee_collector_address(),
            override_transactions: Vec::new(),
            is_optimistic_execution: false,
            sequencer_block_hash: None,
        })
        .unwrap();
    service
        .chain
        .insert_block_without_set_head(block_b.clone())
        .unwrap();

    let firm = raw::Block {
        number: u32::try_from(block_b.number()).unwrap(),
        hash: Bytes::copy_from_slice(&block_b.hash()),
        parent_block_hash: Bytes::copy_from_slice(&block_b.parent_hash()),
        timestamp: Some(Timestamp {
            seconds: i64::try_from(soft.timestamp + 4).unwrap(),
            nanos: 0,
        }),
    };
    let status = service
        .server
        .clone()
        .update_commitment_state(Request::new(raw::UpdateCommitmentStateRequest {
            commitment_state: Some(raw::CommitmentState {
                soft: Some(block_a),
                firm: Some(firm),
                base_celestia_height: CELESTIA_INITIAL_HEIGHT,
            }),
        }))
        .await
        .unwrap_err();
    assert_eq!(Code::InvalidArgument, status.code());

    // the canonical chain is rolled back to the pre-call head
    assert_eq!(original_head.hash(), service.chain.head_header().hash());
    assert_eq!(None, service.chain.canonical_hash_at(11));
}

#[tokio::test]
async fn identical_requests_produce_identical_blocks() {
    let first = setup_service(10);
    let second = setup_service(10);
    let (genesis_info, _) = handshake(&first).await;
    handshake(&second).await;

    let destination = Address::new([0xd0; 20]);
    let make_transactions = || {
        let mut transactions = signed_transfers(5);
        transactions.push(deposit_item(&genesis_info, destination, ONE_NRIA));
        transactions
    };
    let first_request = execute_block_request(&first, make_transactions());
    let second_request = execute_block_request(&second, make_transactions());
    assert_eq!(first_request, second_request);

    let first_block = first
        .server
        .clone()
        .execute_block(Request::new(first_request))
        .await
        .unwrap()
        .into_inner();
    let second_block = second
        .server
        .clone()
        .execute_block(Request::new(second_request))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(first_block, second_block);
}

#[tokio::test]
async fn cancun_blocks_require_the_sequencer_block_hash() {
    let mut genesis = genesis_config();
    genesis.cancun_time = Some(0);
    let service = setup_service_with_genesis(genesis, 10);
    handshake(&service).await;

    let mut request = execute_block_request(&service, signed_transfers(5));
    let status = service
        .server
        .clone()
        .execute_block(Request::new(request.clone()))
        .await
        .unwrap_err();
    assert_eq!(Code::InvalidArgument, status.code());

    request.sequencer_block_hash = Some(Bytes::from_static(&[3; 32]));
    let executed = service
        .server
        .clone()
        .execute_block(Request::new(request))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(11, executed.number);
}

#[tokio::test]
async fn sequencer_block_hash_is_rejected_before_cancun() {
    let service = setup_service(10);
    handshake(&service).await;

    let mut request = execute_block_request(&service, signed_transfers(5));
    request.sequencer_block_hash = Some(Bytes::from_static(&[3; 32]));
    let status = service
        .server
        .clone()
        .execute_block(Request::new(request))
        .await
        .unwrap_err();
    assert_eq!(Code::InvalidArgument, status.code());
}

#[tokio::test]
async fn fee_collector_and_auctioneer_rotate_at_their_configured_heights() {
    let mut genesis = genesis_config();
    let next_collector = Address::new([0xfc; 20]);
    genesis
        .fee_collectors
        .insert(12, next_collector.to_string());
    let next_auctioneer = encode_bech32m(ADDRESS_PREFIX, [0xab; 20]);
    genesis.auctioneer_addresses.insert(12, next_auctioneer.clone());
    let service = setup_service_with_genesis(genesis, 10);
    handshake(&service).await;

    assert_eq!(fee_collector_address(), service.state.next_fee_recipient());
    assert_eq!(auctioneer_address(), service.state.auctioneer_address());

    service
        .server
        .clone()
        .execute_block(Request::new(execute_block_request(
            &service,
            signed_transfers(5),
        )))
        .await
        .unwrap();

    assert_eq!(next_collector, service.state.next_fee_recipient());
    assert_eq!(next_auctioneer, service.state.auctioneer_address());
}

#[tokio::test]
async fn invalid_auctioneer_address_is_logged_and_skipped() {
    let mut genesis = genesis_config();
    genesis
        .auctioneer_addresses
        .insert(12, "not a bech32m address".to_string());
    let service = setup_service_with_genesis(genesis, 10);
    handshake(&service).await;

    service
        .server
        .clone()
        .execute_block(Request::new(execute_block_request(
            &service,
            signed_transfers(5),
        )))
        .await
        .unwrap();

    // the configured address at height 1 remains active
    assert_eq!(auctioneer_address(), service.state.auctioneer_address());
}
