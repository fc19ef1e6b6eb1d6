//! The chain genesis configuration.
//!
//! Read once at process start from a json file and never re-read at
//! runtime.

use std::{
    collections::BTreeMap,
    path::Path,
};

use eyre::WrapErr as _;
use serde::Deserialize;

/// A bridge account on the sequencer whose deposits this rollup accepts.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BridgeAddressConfig {
    /// The bech32m encoded address of the bridge account.
    pub(crate) bridge_address: String,
    /// The denomination of the asset bridged through the account.
    pub(crate) asset_denom: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GenesisAccount {
    pub(crate) balance: u128,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct GenesisConfig {
    /// The clear text name of the rollup. The rollup ID is its sha256 digest.
    pub(crate) rollup_name: String,
    /// The height of the first sequencer block carrying transactions of this
    /// rollup.
    pub(crate) sequencer_initial_height: u32,
    /// The celestia height to start searching for the first firm block at.
    pub(crate) celestia_initial_height: u64,
    /// The allowed variance in celestia height for sequencer blocks to have
    /// been posted at.
    pub(crate) celestia_height_variance: u64,
    /// The bech32 human readable prefix of sequencer addresses.
    pub(crate) sequencer_address_prefix: String,
    /// The bridge accounts whose deposits are accepted.
    #[serde(default)]
    pub(crate) bridge_address_configs: Vec<BridgeAddressConfig>,
    /// Per-height fee recipients. The collector configured at the greatest
    /// height at or below a block's height receives that block's fees.
    #[serde(default)]
    pub(crate) fee_collectors: BTreeMap<u32, String>,
    /// Per-height auctioneer addresses, selected like `fee_collectors`.
    #[serde(default)]
    pub(crate) auctioneer_addresses: BTreeMap<u32, String>,
    /// The unix timestamp at which Cancun activates. Blocks built at or
    /// after this timestamp must carry a sequencer block hash.
    #[serde(default)]
    pub(crate) cancun_time: Option<u64>,
    /// The block gas limit.
    pub(crate) gas_limit: u64,
    /// The timestamp of the genesis block.
    #[serde(default)]
    pub(crate) timestamp: u64,
    /// The accounts funded at genesis, keyed by hex encoded address.
    #[serde(default)]
    pub(crate) alloc: BTreeMap<String, GenesisAccount>,
}

impl GenesisConfig {
    /// Reads the genesis configuration from a json file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not contain a
    /// valid genesis configuration.
    pub(crate) fn from_path<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .wrap_err("failed reading genesis file")?;
        serde_json::from_str(&contents).wrap_err("failed parsing genesis file")
    }

    /// Whether Cancun is active for a block at `number` and `timestamp`.
    pub(crate) fn is_cancun(&self, _number: u64, timestamp: u64) -> bool {
        self.cancun_time
            .is_some_and(|activation| timestamp >= activation)
    }
}

#[cfg(test)]
mod tests {
    use super::GenesisConfig;

    const EXAMPLE_GENESIS: &str = r#"{
        "rollup_name": "test",
        "sequencer_initial_height": 10,
        "celestia_initial_height": 5,
        "celestia_height_variance": 100,
        "sequencer_address_prefix": "astria",
        "bridge_address_configs": [
            {
                "bridge_address": "astria1hwamhwamhwamhwamhwamhwamhwamhwamnvj02m",
                "asset_denom": "nria"
            }
        ],
        "fee_collectors": {
            "1": "0x2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a"
        },
        "cancun_time": 1700000000,
        "gas_limit": 30000000,
        "timestamp": 1690000000,
        "alloc": {
            "0x0101010101010101010101010101010101010101": { "balance": 1000000000000000000 }
        }
    }"#;

    #[test]
    fn example_genesis_parses() {
        let genesis: GenesisConfig = serde_json::from_str(EXAMPLE_GENESIS).unwrap();
        assert_eq!("test", genesis.rollup_name);
        assert_eq!(10, genesis.sequencer_initial_height);
        assert_eq!(1, genesis.bridge_address_configs.len());
        assert_eq!(
            "0x2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a",
            genesis.fee_collectors[&1],
        );
    }

    #[test]
    fn cancun_activates_at_the_configured_timestamp() {
        let genesis: GenesisConfig = serde_json::from_str(EXAMPLE_GENESIS).unwrap();
        assert!(!genesis.is_cancun(1, 1_699_999_999));
        assert!(genesis.is_cancun(1, 1_700_000_000));
        assert!(genesis.is_cancun(1, 1_700_000_001));
    }
}
