use std::time::Instant;

use ::metrics::{
    counter,
    describe_counter,
    describe_gauge,
    describe_histogram,
    gauge,
    histogram,
    Counter,
    Gauge,
    Histogram,
    Unit,
};

/// All metrics emitted by the execution node.
///
/// Request counters are incremented on entry into a procedure, success
/// counters right before returning its response, so that failure counts can
/// be derived as the difference of the two.
pub struct Metrics {
    get_genesis_info_requests: Counter,
    get_genesis_info_success: Counter,
    get_block_requests: Counter,
    get_block_success: Counter,
    batch_get_blocks_requests: Counter,
    batch_get_blocks_success: Counter,
    execute_block_requests: Counter,
    execute_block_success: Counter,
    get_commitment_state_requests: Counter,
    get_commitment_state_success: Counter,
    update_commitment_state_requests: Counter,
    update_commitment_state_success: Counter,
    total_executed_transactions: Counter,
    soft_commitment_height: Gauge,
    firm_commitment_height: Gauge,
    execute_block_latency: Histogram,
    update_commitment_state_latency: Histogram,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        describe_counter!(
            GET_GENESIS_INFO_REQUESTS,
            "The number of GetGenesisInfo requests received"
        );
        describe_counter!(
            GET_GENESIS_INFO_SUCCESS,
            "The number of GetGenesisInfo requests answered successfully"
        );
        describe_counter!(GET_BLOCK_REQUESTS, "The number of GetBlock requests received");
        describe_counter!(
            GET_BLOCK_SUCCESS,
            "The number of GetBlock requests answered successfully"
        );
        describe_counter!(
            BATCH_GET_BLOCKS_REQUESTS,
            "The number of BatchGetBlocks requests received"
        );
        describe_counter!(
            BATCH_GET_BLOCKS_SUCCESS,
            "The number of BatchGetBlocks requests answered successfully"
        );
        describe_counter!(
            EXECUTE_BLOCK_REQUESTS,
            "The number of ExecuteBlock requests received"
        );
        describe_counter!(
            EXECUTE_BLOCK_SUCCESS,
            "The number of ExecuteBlock requests answered successfully"
        );
        describe_counter!(
            GET_COMMITMENT_STATE_REQUESTS,
            "The number of GetCommitmentState requests received"
        );
        describe_counter!(
            GET_COMMITMENT_STATE_SUCCESS,
            "The number of GetCommitmentState requests answered successfully"
        );
        describe_counter!(
            UPDATE_COMMITMENT_STATE_REQUESTS,
            "The number of UpdateCommitmentState requests received"
        );
        describe_counter!(
            UPDATE_COMMITMENT_STATE_SUCCESS,
            "The number of UpdateCommitmentState requests answered successfully"
        );
        describe_counter!(
            TOTAL_EXECUTED_TRANSACTIONS,
            "The total number of transactions included in executed blocks"
        );
        describe_gauge!(
            SOFT_COMMITMENT_HEIGHT,
            "The block number of the latest soft commitment"
        );
        describe_gauge!(
            FIRM_COMMITMENT_HEIGHT,
            "The block number of the latest firm commitment"
        );
        describe_histogram!(
            EXECUTE_BLOCK_LATENCY,
            Unit::Seconds,
            "The time spent executing a block, measured inside the execution lock"
        );
        describe_histogram!(
            UPDATE_COMMITMENT_STATE_LATENCY,
            Unit::Seconds,
            "The time spent updating the commitment state"
        );

        Self {
            get_genesis_info_requests: counter!(GET_GENESIS_INFO_REQUESTS),
            get_genesis_info_success: counter!(GET_GENESIS_INFO_SUCCESS),
            get_block_requests: counter!(GET_BLOCK_REQUESTS),
            get_block_success: counter!(GET_BLOCK_SUCCESS),
            batch_get_blocks_requests: counter!(BATCH_GET_BLOCKS_REQUESTS),
            batch_get_blocks_success: counter!(BATCH_GET_BLOCKS_SUCCESS),
            execute_block_requests: counter!(EXECUTE_BLOCK_REQUESTS),
            execute_block_success: counter!(EXECUTE_BLOCK_SUCCESS),
            get_commitment_state_requests: counter!(GET_COMMITMENT_STATE_REQUESTS),
            get_commitment_state_success: counter!(GET_COMMITMENT_STATE_SUCCESS),
            update_commitment_state_requests: counter!(UPDATE_COMMITMENT_STATE_REQUESTS),
            update_commitment_state_success: counter!(UPDATE_COMMITMENT_STATE_SUCCESS),
            total_executed_transactions: counter!(TOTAL_EXECUTED_TRANSACTIONS),
            soft_commitment_height: gauge!(SOFT_COMMITMENT_HEIGHT),
            firm_commitment_height: gauge!(FIRM_COMMITMENT_HEIGHT),
            execute_block_latency: histogram!(EXECUTE_BLOCK_LATENCY),
            update_commitment_state_latency: histogram!(UPDATE_COMMITMENT_STATE_LATENCY),
        }
    }

    pub(crate) fn increment_get_genesis_info_requests(&self) {
        self.get_genesis_info_requests.increment(1);
    }

    pub(crate) fn increment_get_genesis_info_success(&self) {
        self.get_genesis_info_success.increment(1);
    }

    pub(crate) fn increment_get_block_requests(&self) {
        self.get_block_requests.increment(1);
    }

    pub(crate) fn increment_get_block_success(&self) {
        self.get_block_success.increment(1);
    }

    pub(crate) fn increment_batch_get_blocks_requests(&self) {
        self.batch_get_blocks_requests.increment(1);
    }

    pub(crate) fn increment_batch_get_blocks_success(&self) {
        self.batch_get_blocks_success.increment(1);
    }

    pub(crate) fn increment_execute_block_requests(&self) {
        self.execute_block_requests.increment(1);
    }

    pub(crate) fn increment_execute_block_success(&self) {
        self.execute_block_success.increment(1);
    }

    pub(crate) fn increment_get_commitment_state_requests(&self) {
        self.get_commitment_state_requests.increment(1);
    }

    pub(crate) fn increment_get_commitment_state_success(&self) {
        self.get_commitment_state_success.increment(1);
    }

    pub(crate) fn increment_update_commitment_state_requests(&self) {
        self.update_commitment_state_requests.increment(1);
    }

    pub(crate) fn increment_update_commitment_state_success(&self) {
        self.update_commitment_state_success.increment(1);
    }

    pub(crate) fn increment_total_executed_transactions(&self, count: u64) {
        self.total_executed_transactions.increment(count);
    }

    pub(crate) fn set_soft_commitment_height(&self, height: u64) {
        self.soft_commitment_height.set(height as f64);
    }

    pub(crate) fn set_firm_commitment_height(&self, height: u64) {
        self.firm_commitment_height.set(height as f64);
    }

    pub(crate) fn start_execute_block_timer(&self) -> Timer {
        Timer::new(self.execute_block_latency.clone())
    }

    pub(crate) fn start_update_commitment_state_timer(&self) -> Timer {
        Timer::new(self.update_commitment_state_latency.clone())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Records the time from its construction to its drop in the wrapped
/// histogram, mirroring a deferred timer update.
pub(crate) struct Timer {
    histogram: Histogram,
    start: Instant,
}

impl Timer {
    fn new(histogram: Histogram) -> Self {
        Self {
            histogram,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.histogram.record(self.start.elapsed().as_secs_f64());
    }
}

const GET_GENESIS_INFO_REQUESTS: &str = "astria_execution_node_get_genesis_info_requests";
const GET_GENESIS_INFO_SUCCESS: &str = "astria_execution_node_get_genesis_info_success";
const GET_BLOCK_REQUESTS: &str = "astria_execution_node_get_block_requests";
const GET_BLOCK_SUCCESS: &str = "astria_execution_node_get_block_success";
const BATCH_GET_BLOCKS_REQUESTS: &str = "astria_execution_node_batch_get_blocks_requests";
const BATCH_GET_BLOCKS_SUCCESS: &str = "astria_execution_node_batch_get_blocks_success";
const EXECUTE_BLOCK_REQUESTS: &str = "astria_execution_node_execute_block_requests";
const EXECUTE_BLOCK_SUCCESS: &str = "astria_execution_node_execute_block_success";
const GET_COMMITMENT_STATE_REQUESTS: &str = "astria_execution_node_get_commitment_state_requests";
const GET_COMMITMENT_STATE_SUCCESS: &str = "astria_execution_node_get_commitment_state_success";
const UPDATE_COMMITMENT_STATE_REQUESTS: &str =
    "astria_execution_node_update_commitment_state_requests";
const UPDATE_COMMITMENT_STATE_SUCCESS: &str =
    "astria_execution_node_update_commitment_state_success";
const TOTAL_EXECUTED_TRANSACTIONS: &str = "astria_execution_node_total_executed_transactions";
const SOFT_COMMITMENT_HEIGHT: &str = "astria_execution_node_soft_commitment_height";
const FIRM_COMMITMENT_HEIGHT: &str = "astria_execution_node_firm_commitment_height";
const EXECUTE_BLOCK_LATENCY: &str = "astria_execution_node_execute_block_latency";
const UPDATE_COMMITMENT_STATE_LATENCY: &str =
    "astria_execution_node_update_commitment_state_latency";
