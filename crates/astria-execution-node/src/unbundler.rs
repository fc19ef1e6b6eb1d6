//! Unbundling of sequencer rollup data into executable transactions.

use std::collections::{
    HashMap,
    HashSet,
};

use astria_execution_api::{
    generated::astria::sequencerblock::v1 as raw,
    sequencerblock::v1::{
        Deposit,
        RollupData,
    },
};
use sha2::{
    Digest as _,
    Sha256,
};
use tracing::warn;

use crate::chain::{
    genesis::BridgeAddressConfig,
    transaction::{
        DepositTransaction,
        SignedTransaction,
    },
    Address,
    AddressError,
    Transaction,
};

/// Classifies the items of an `ExecuteBlockRequest` into executable
/// transactions.
///
/// Sequenced data is decoded as the rollup's native transaction envelope;
/// deposits are matched against the immutable bridge registry and
/// synthesized into deterministic system transactions. Items failing either
/// are skipped, never aborting the block. The unbundler reads no mutable
/// state, so its output is a pure function of its inputs and the registry.
pub(crate) struct RollupDataUnbundler {
    bridge_allowed_assets: HashMap<String, HashSet<String>>,
}

impl RollupDataUnbundler {
    #[must_use]
    pub(crate) fn new(bridge_configs: &[BridgeAddressConfig]) -> Self {
        let mut bridge_allowed_assets: HashMap<String, HashSet<String>> = HashMap::new();
        for config in bridge_configs {
            bridge_allowed_assets
                .entry(config.bridge_address.clone())
                .or_default()
                .insert(config.asset_denom.clone());
        }
        Self {
            bridge_allowed_assets,
        }
    }

    /// Unbundles `items` into an ordered list of executable transactions for
    /// the block at `block_number` on top of `prev_block_hash`.
    ///
    /// Output order equals input order.
    pub(crate) fn unbundle(
        &self,
        items: Vec<raw::RollupData>,
        block_number: u64,
        prev_block_hash: &[u8; 32],
    ) -> Vec<Transaction> {
        let mut transactions = Vec::with_capacity(items.len());
        for item in items {
            match RollupData::try_from_raw(item) {
                Err(error) => {
                    warn!(%error, "dropping undecodable rollup data item");
                }
                Ok(RollupData::SequencedData(data)) => {
                    match SignedTransaction::try_from_bytes(&data) {
                        Ok(transaction) => transactions.push(Transaction::Sequenced(transaction)),
                        Err(error) => {
                            warn!(
                                %error,
                                "dropping sequenced data that is not a valid transaction envelope",
                            );
                        }
                    }
                }
                Ok(RollupData::Deposit(deposit)) => {
                    match self.synthesize_deposit(&deposit, block_number, prev_block_hash) {
                        Ok(transaction) => transactions.push(Transaction::Deposit(transaction)),
                        Err(reason) => {
                            warn!(
                                %reason,
                                bridge_address = deposit.bridge_address,
                                asset = deposit.asset,
                                "dropping deposit",
                            );
                        }
                    }
                }
            }
        }
        transactions
    }

    /// Synthesizes the system transaction crediting a deposit.
    ///
    /// The transaction is uniquely derived from the block position and the
    /// deposit's source so that identical inputs produce identical
    /// transactions on every honest node.
    fn synthesize_deposit(
        &self,
        deposit: &Deposit,
        block_number: u64,
        prev_block_hash: &[u8; 32],
    ) -> Result<DepositTransaction, DepositRejection> {
        let Some(allowed_assets) = self.bridge_allowed_assets.get(&deposit.bridge_address) else {
            return Err(DepositRejection::UnknownBridge);
        };
        if !allowed_assets.contains(&deposit.asset) {
            return Err(DepositRejection::AssetNotAllowed);
        }
        let destination = Address::try_from_hex(&deposit.destination_chain_address)
            .map_err(DepositRejection::Destination)?;

        let mut hasher = Sha256::new();
        hasher.update(block_number.to_be_bytes());
        hasher.update(prev_block_hash);
        hasher.update(deposit.source_transaction_id.get().as_bytes());
        hasher.update(deposit.source_action_index.to_be_bytes());

        Ok(DepositTransaction {
            destination,
            amount: deposit.amount,
            source_id: hasher.finalize().into(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum DepositRejection {
    #[error("the bridge address is not in the configured bridge set")]
    UnknownBridge,
    #[error("the asset is not in the allowed set of the bridge")]
    AssetNotAllowed,
    #[error("the destination chain address is invalid")]
    Destination(#[source] AddressError),
}
