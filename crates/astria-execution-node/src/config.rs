//! The execution node configuration.

use figment::{
    providers::Env,
    Figment,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The address of the gRPC endpoint serving the execution API.
    pub grpc_addr: String,
    /// Set to true to additionally serve the execution API on a unix domain
    /// socket for a colocated auctioneer.
    pub enable_auctioneer: bool,
    /// The path of the unix domain socket. Only used if `enable_auctioneer`
    /// is true.
    pub grpc_uds_path: String,
    /// The path to the json encoded chain genesis configuration.
    pub genesis_path: String,
    /// Log filter directives.
    pub log: String,
    /// Writes a human readable format to stdout instead of JSON formatted
    /// lines.
    pub pretty_print: bool,
    /// Set to true to disable the metrics server.
    pub no_metrics: bool,
    /// The endpoint which will be listened on for serving prometheus metrics.
    pub metrics_http_listener_addr: String,
}

impl Config {
    const PREFIX: &'static str = "ASTRIA_EXECUTION_NODE_";

    /// Reads the configuration from the environment.
    ///
    /// Every field of [`Config`] is read from a `ASTRIA_EXECUTION_NODE_`
    /// prefixed environment variable, with `RUST_LOG` doubling as a
    /// fallback source of the log directives.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is missing or cannot be parsed as the
    /// type of its field.
    pub fn get() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Env::prefixed("RUST_").split("_").only(&["log"]))
            .merge(Env::prefixed(Self::PREFIX))
            .extract()
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    const EXAMPLE_ENV: &str = include_str!("../local.env.example");

    #[test]
    fn example_env_config_is_up_to_date() {
        figment::Jail::expect_with(|jail| {
            for line in EXAMPLE_ENV.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let (key, value) = line
                    .split_once('=')
                    .expect("env example must only contain `key=value` lines");
                jail.set_env(key, value);
            }
            Config::get().expect("all config fields must be set in local.env.example");
            Ok(())
        });
    }
}
