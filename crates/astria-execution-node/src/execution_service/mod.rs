//! The gRPC server implementing the `astria.execution.v1` API.
//!
//! Its procedures are called from the conductor. It is responsible for
//! immediately executing lists of ordered transactions that come from the
//! shared sequencer, and for advancing the soft and firm commitments of the
//! chain.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use astria_execution_api::{
    execution::v1::CommitmentState,
    generated::astria::execution::v1::{
        self as raw,
        execution_service_server::ExecutionService,
    },
    primitive::v1::RollupId,
    Protobuf as _,
};
use bytes::Bytes;
use eyre::WrapErr as _;
use pbjson_types::Timestamp;
use tonic::{
    Request,
    Response,
    Status,
};
use tracing::{
    debug,
    error,
    info,
    instrument,
};

use crate::{
    chain::{
        Header,
        PayloadAttributes,
    },
    metrics::Metrics,
    state::ServiceState,
    validation::{
        validate_bech32m_address,
        validate_static_execute_block_request,
    },
};

pub(crate) struct Server {
    state: Arc<ServiceState>,
    metrics: &'static Metrics,
}

impl Server {
    pub(crate) fn new(state: Arc<ServiceState>, metrics: &'static Metrics) -> Self {
        Self {
            state,
            metrics,
        }
    }

    fn block_from_identifier(
        &self,
        identifier: &raw::BlockIdentifier,
    ) -> Result<raw::Block, Status> {
        use raw::block_identifier::Identifier;

        let header = match &identifier.identifier {
            Some(Identifier::BlockNumber(number)) => {
                self.state.chain().header_by_number((*number).into())
            }
            Some(Identifier::BlockHash(hash)) => <[u8; 32]>::try_from(hash.as_ref())
                .ok()
                .and_then(|hash| self.state.chain().header_by_hash(&hash)),
            None => return Err(Status::invalid_argument("identifier is not set")),
        };
        let Some(header) = header else {
            return Err(Status::not_found(
                "Couldn't locate block with the given identifier",
            ));
        };
        header_to_raw_block(&header)
            .map_err(|error| Status::internal(format!("internal error: {error:#}")))
    }
}

#[tonic::async_trait]
impl ExecutionService for Server {
    #[instrument(skip_all)]
    async fn get_genesis_info(
        self: Arc<Self>,
        _request: Request<raw::GetGenesisInfoRequest>,
    ) -> Result<Response<raw::GenesisInfo>, Status> {
        debug!("GetGenesisInfo called");
        self.metrics.increment_get_genesis_info_requests();

        let rollup_id = RollupId::from_unhashed_bytes(self.state.rollup_name());
        let genesis_info = raw::GenesisInfo {
            rollup_id: Some(rollup_id.to_raw()),
            sequencer_genesis_block_height: self.state.sequencer_initial_height(),
            celestia_block_variance: self.state.celestia_height_variance(),
        };

        info!(%rollup_id, "GetGenesisInfo completed");
        self.metrics.increment_get_genesis_info_success();
        self.state.set_genesis_info_called();
        Ok(Response::new(genesis_info))
    }

    #[instrument(skip_all)]
    async fn get_block(
        self: Arc<Self>,
        request: Request<raw::GetBlockRequest>,
    ) -> Result<Response<raw::Block>, Status> {
        let request = request.into_inner();
        let Some(identifier) = &request.identifier else {
            return Err(Status::invalid_argument("identifier cannot be empty"));
        };

        debug!("GetBlock called");
        self.metrics.increment_get_block_requests();

        let block = self.block_from_identifier(identifier).map_err(|status| {
            error!(error = status.message(), "failed finding block");
            status
        })?;

        debug!(block_num = block.number, "GetBlock completed");
        self.metrics.increment_get_block_success();
        Ok(Response::new(block))
    }

    #[instrument(skip_all)]
    async fn batch_get_blocks(
        self: Arc<Self>,
        request: Request<raw::BatchGetBlocksRequest>,
    ) -> Result<Response<raw::BatchGetBlocksResponse>, Status> {
        let request = request.into_inner();
        if request.identifiers.is_empty() {
            return Err(Status::invalid_argument("identifiers cannot be empty"));
        }

        self.metrics.increment_batch_get_blocks_requests();
        debug!(
            num_blocks_requested = request.identifiers.len(),
            "BatchGetBlocks called"
        );

        let mut blocks = Vec::with_capacity(request.identifiers.len());
        for identifier in &request.identifiers {
            let block = self.block_from_identifier(identifier).map_err(|status| {
                error!(error = status.message(), "failed finding block in batch");
                status
            })?;
            blocks.push(block);
        }

        info!("BatchGetBlocks completed");
        self.metrics.increment_batch_get_blocks_success();
        Ok(Response::new(raw::BatchGetBlocksResponse {
            blocks,
        }))
    }

    #[instrument(skip_all)]
    async fn execute_block(
        self: Arc<Self>,
        request: Request<raw::ExecuteBlockRequest>,
    ) -> Result<Response<raw::Block>, Status> {
        let request = request.into_inner();
        if let Err(error) = validate_static_execute_block_request(&request) {
            error!(%error, "ExecuteBlock called with invalid ExecuteBlockRequest");
            return Err(Status::invalid_argument("ExecuteBlockRequest is invalid"));
        }
        debug!(
            prev_block_hash = %hex::encode(&request.prev_block_hash),
            tx_count = request.transactions.len(),
            "ExecuteBlock called",
        );
        self.metrics.increment_execute_block_requests();

        let _execution_lock = self.state.execution_lock().lock().await;
        // Deliberately started after the lock, to more directly measure the
        // time spent executing
        let _timer = self.metrics.start_execute_block_timer();

        if !self.state.sync_methods_called() {
            return Err(Status::permission_denied(
                "Cannot execute block until GetGenesisInfo && GetCommitmentState methods are \
                 called",
            ));
        }

        let prev_block_hash: [u8; 32] = request
            .prev_block_hash
            .as_ref()
            .try_into()
            .expect("the hash length was checked during static validation");

        let soft_header = self
            .state
            .chain()
            .safe_header()
            .ok_or_else(|| Status::internal("could not locate soft block"))?;
        if soft_header.hash() != prev_block_hash {
            return Err(Status::failed_precondition(
                "Block can only be created on top of soft block.",
            ));
        }

        // the height that this block will be at
        let height = self.state.chain().head_header().number.saturating_add(1);
        let block_timestamp = u64::try_from(
            request
                .timestamp
                .as_ref()
                .expect("the timestamp presence was checked during static validation")
                .seconds,
        )
        .expect("the timestamp positivity was checked during static validation");

        let sequencer_block_hash = if self.state.is_cancun(height, block_timestamp) {
            let Some(hash) = &request.sequencer_block_hash else {
                return Err(Status::invalid_argument(
                    "Sequencer block hash must be set for Cancun block",
                ));
            };
            let hash = <[u8; 32]>::try_from(hash.as_ref()).map_err(|_| {
                Status::invalid_argument("Sequencer block hash must be 32 bytes")
            })?;
            Some(hash)
        } else {
            if request.sequencer_block_hash.is_some() {
                return Err(Status::invalid_argument(
                    "Sequencer block hash must not be set before the Cancun activation",
                ));
            }
            None
        };

        let transactions =
            self.state
                .unbundler()
                .unbundle(request.transactions, height, &prev_block_hash);

        // This ordered set of txs on the mempool is consumed by the payload
        // builder.
        self.state.mempool().set_ordered(transactions);

        let payload_attributes = PayloadAttributes {
            parent: prev_block_hash,
            timestamp: block_timestamp,
            prev_randao: [0; 32],
            fee_recipient: self.state.next_fee_recipient(),
            override_transactions: Vec::new(),
            is_optimistic_execution: false,
            sequencer_block_hash,
        };
        let block = self
            .state
            .state_machine()
            .build_payload(payload_attributes)
            .map_err(|error| {
                error!(%error, "failed to build payload");
                Status::invalid_argument(format!(
                    "Could not build block with provided txs: {error:#}"
                ))
            })?;

        self.state
            .chain()
            .insert_block_without_set_head(block.clone())
            .map_err(|error| {
                error!(
                    %error,
                    hash = %hex::encode(block.hash()),
                    "failed to insert block to chain",
                );
                Status::internal(format!("failed to insert block to chain: {error:#}"))
            })?;

        // remove txs from the mempool
        self.state.mempool().clear_ordered();

        let response = header_to_raw_block(block.header()).map_err(|error| {
            Status::internal(format!("failed converting the built block: {error:#}"))
        })?;

        let next_height = response.number.saturating_add(1);
        if let Some(next) = self.state.fee_collector_at(next_height) {
            self.state.set_next_fee_recipient(next);
        }
        if let Some(address) = self.state.auctioneer_address_at(next_height) {
            match validate_bech32m_address(address, self.state.sequencer_address_prefix()) {
                Ok(()) => self.state.set_auctioneer_address(address.to_string()),
                Err(error) => error!(
                    %error,
                    block = next_height,
                    address,
                    "auctioneer address is not a valid bech32 address",
                ),
            }
        }

        info!(block_num = response.number, "ExecuteBlock completed");
        self.metrics
            .increment_total_executed_transactions(block.transactions().len() as u64);
        self.metrics.increment_execute_block_success();
        Ok(Response::new(response))
    }

    #[instrument(skip_all)]
    async fn get_commitment_state(
        self: Arc<Self>,
        _request: Request<raw::GetCommitmentStateRequest>,
    ) -> Result<Response<raw::CommitmentState>, Status> {
        info!("GetCommitmentState called");
        self.metrics.increment_get_commitment_state_requests();

        let chain = self.state.chain();
        let Some(soft_header) = chain.safe_header() else {
            error!("error finding safe block");
            return Err(Status::internal("could not locate soft block"));
        };
        let soft = header_to_raw_block(&soft_header).map_err(|error| {
            error!(%error, "error finding safe block");
            Status::internal(format!("could not locate soft block: {error:#}"))
        })?;
        let Some(final_header) = chain.final_header() else {
            error!("error finding final block");
            return Err(Status::internal("could not locate firm block"));
        };
        let firm = header_to_raw_block(&final_header).map_err(|error| {
            error!(%error, "error finding final block");
            Status::internal(format!("could not locate firm block: {error:#}"))
        })?;

        let commitment_state = raw::CommitmentState {
            soft: Some(soft),
            firm: Some(firm),
            base_celestia_height: chain.base_celestia_height(),
        };

        info!(
            soft_height = commitment_state.soft.as_ref().map(|soft| soft.number),
            firm_height = commitment_state.firm.as_ref().map(|firm| firm.number),
            base_celestia_height = commitment_state.base_celestia_height,
            "GetCommitmentState completed",
        );
        self.metrics.increment_get_commitment_state_success();
        self.state.set_commitment_state_called();
        Ok(Response::new(commitment_state))
    }

    #[instrument(skip_all)]
    async fn update_commitment_state(
        self: Arc<Self>,
        request: Request<raw::UpdateCommitmentStateRequest>,
    ) -> Result<Response<raw::CommitmentState>, Status> {
        let request = request.into_inner();
        let commitment_state = request
            .commitment_state
            .as_ref()
            .ok_or_else(|| Status::invalid_argument("CommitmentState is invalid"))
            .and_then(|raw_state| {
                CommitmentState::try_from_raw_ref(raw_state).map_err(|error| {
                    error!(%error, "UpdateCommitmentState called with invalid CommitmentState");
                    Status::invalid_argument("CommitmentState is invalid")
                })
            })?;

        debug!(
            request_soft_height = commitment_state.soft().number(),
            request_firm_height = commitment_state.firm().number(),
            "UpdateCommitmentState called",
        );
        self.metrics.increment_update_commitment_state_requests();
        let _timer = self.metrics.start_update_commitment_state_timer();

        let _commitment_lock = self.state.commitment_lock().lock().await;

        if !self.state.sync_methods_called() {
            return Err(Status::permission_denied(
                "Cannot update commitment state until GetGenesisInfo && GetCommitmentState \
                 methods are called",
            ));
        }

        let chain = self.state.chain();
        if chain.base_celestia_height() > commitment_state.base_celestia_height() {
            return Err(Status::invalid_argument(format!(
                "Base Celestia height cannot be decreased, current_base_celestia_height: {}, \
                 new_base_celestia_height: {}",
                chain.base_celestia_height(),
                commitment_state.base_celestia_height(),
            )));
        }

        let soft_hash = commitment_state.soft().hash();
        let firm_hash = commitment_state.firm().hash();

        // Validate that the firm and soft blocks exist before going further
        let Some(soft_block) = chain.block_by_hash(&soft_hash) else {
            return Err(Status::invalid_argument(
                "Soft block specified does not exist",
            ));
        };
        let Some(firm_block) = chain.block_by_hash(&firm_hash) else {
            return Err(Status::invalid_argument(
                "Firm block specified does not exist",
            ));
        };

        let current_head = chain.head_header().hash();

        // Update the canonical chain to soft block. This must happen before
        // the last validation step since there is no way to check if the firm
        // block descends from anything but the canonical chain
        if current_head != soft_hash {
            if let Err(error) = chain.set_canonical(&soft_block) {
                error!(%error, "failed updating canonical chain to soft block");
                return Err(Status::internal(format!(
                    "Could not update head to safe hash: {error:#}"
                )));
            }
        }

        // Once the head is updated validate that firm belongs to the chain
        if chain.canonical_hash_at(firm_block.number()) != Some(firm_hash) {
            error!("firm block not found in canonical chain defined by soft block, rolling back");

            let rollback_block = chain
                .block_by_hash(&current_head)
                .expect("the previous head always names a stored block");
            if chain.set_canonical(&rollback_block).is_err() {
                panic!("rollback to previous head after failed validation failed");
            }

            return Err(Status::invalid_argument(
                "soft block in request is not a descendant of the current firmly committed block",
            ));
        }

        self.state.state_machine().set_synced();

        // Updating the safe and final pointers after everything validated
        if chain.safe_header().map(|header| header.hash()) != Some(soft_hash) {
            chain.set_safe(soft_block.header());
        }

        if chain.final_header().map(|header| header.hash()) != Some(firm_hash) {
            chain.set_celestia_finalized(firm_block.header(), commitment_state.base_celestia_height());
        }

        info!(
            soft_height = soft_block.number(),
            firm_height = firm_block.number(),
            "UpdateCommitmentState completed",
        );
        self.metrics.set_soft_commitment_height(soft_block.number());
        self.metrics.set_firm_commitment_height(firm_block.number());
        self.metrics.increment_update_commitment_state_success();
        Ok(Response::new(request.commitment_state.expect(
            "the commitment state was validated to be present above",
        )))
    }
}

fn header_to_raw_block(header: &Header) -> eyre::Result<raw::Block> {
    let number = u32::try_from(header.number)
        .wrap_err("block number does not fit into the wire format")?;
    let seconds = i64::try_from(header.timestamp)
        .wrap_err("block timestamp does not fit into the wire format")?;
    Ok(raw::Block {
        number,
        hash: Bytes::copy_from_slice(&header.hash()),
        parent_block_hash: Bytes::copy_from_slice(&header.parent_hash),
        timestamp: Some(Timestamp {
            seconds,
            nanos: 0,
        }),
    })
}
