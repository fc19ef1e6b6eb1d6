//! The Astria execution node.
//!
//! A rollup execution layer whose block production is driven remotely by the
//! Astria conductor over the [`astria.execution.v1`] gRPC API: the conductor
//! hands the node ordered batches of sequencer data to execute and advances
//! the rollup's soft (sequencer committed) and firm (DA finalized)
//! commitments.
//!
//! [`astria.execution.v1`]: astria_execution_api::generated::astria::execution::v1

mod build_info;
pub(crate) mod chain;
pub mod config;
mod execution_node;
pub(crate) mod execution_service;
mod metrics;
pub(crate) mod state;
#[cfg(test)]
pub(crate) mod test_utils;
pub(crate) mod unbundler;
pub(crate) mod validation;

pub use build_info::BUILD_INFO;
pub use config::Config;
pub use execution_node::ExecutionNode;
pub use metrics::Metrics;
