use std::process::ExitCode;

use astria_execution_node::{
    Config,
    ExecutionNode,
    Metrics,
    BUILD_INFO,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    eprintln!(
        "{}",
        serde_json::to_string(&BUILD_INFO).expect("build info is serializable json"),
    );

    let cfg: Config = match Config::get() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to read configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    eprintln!(
        "starting with configuration:\n{}",
        serde_json::to_string(&cfg).expect("configuration is serializable json"),
    );

    let env_filter = EnvFilter::try_new(&cfg.log).unwrap_or_else(|error| {
        eprintln!("invalid log directives `{}`: {error}; using `info`", cfg.log);
        EnvFilter::new("info")
    });
    if cfg.pretty_print {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .pretty()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .flatten_event(true)
            .init();
    }

    if !cfg.no_metrics {
        let listener_addr: std::net::SocketAddr = match cfg.metrics_http_listener_addr.parse() {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!(
                    "failed to parse metrics listener address `{}`: {e}",
                    cfg.metrics_http_listener_addr,
                );
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = PrometheusBuilder::new()
            .with_http_listener(listener_addr)
            .install()
        {
            eprintln!("failed to set up prometheus metrics exporter: {e}");
            return ExitCode::FAILURE;
        }
    }
    let metrics: &'static Metrics = Box::leak(Box::new(Metrics::new()));

    info!(
        config = serde_json::to_string(&cfg).expect("configuration is serializable json"),
        "initializing execution node"
    );

    let execution_node = match ExecutionNode::from_config(cfg, metrics) {
        Ok(execution_node) => execution_node,
        Err(e) => {
            eprintln!("initializing execution node failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = execution_node.run_until_stopped().await {
        eprintln!("execution node failed: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
