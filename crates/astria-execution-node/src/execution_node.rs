use std::{
    sync::Arc,
    time::Duration,
};

use astria_execution_api::generated::astria::execution::v1::execution_service_server::ExecutionServiceServer;
use eyre::{
    eyre,
    Report,
    WrapErr as _,
};
use tokio::{
    select,
    signal::unix::{
        signal,
        SignalKind,
    },
    sync::watch,
    task::JoinHandle,
    time::timeout,
};
use tokio_stream::wrappers::UnixListenerStream;
use tokio_util::sync::CancellationToken;
use tracing::{
    error,
    info,
    instrument,
};

use crate::{
    chain::{
        blockchain::Blockchain,
        genesis::GenesisConfig,
        mempool::Mempool,
    },
    execution_service::Server,
    state::ServiceState,
    Config,
    Metrics,
};

const GRPC_SERVER_SHUTDOWN_DURATION: Duration = Duration::from_secs(5);

type ServeResult = Result<(), tonic::transport::Error>;

/// The execution node service.
///
/// Boots the embedded chain from the configured genesis and serves the
/// execution API on TCP, and additionally on a unix domain socket when the
/// auctioneer switch is set.
pub struct ExecutionNode {
    grpc_server_handle: Option<JoinHandle<ServeResult>>,
    uds_server_handle: Option<JoinHandle<ServeResult>>,
    shutdown_token: CancellationToken,
    signal_receiver: SignalReceiver,
}

impl ExecutionNode {
    /// Initializes the chain and spawns the gRPC server tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the genesis file cannot be read, the chain or
    /// service state cannot be constructed, or an endpoint cannot be bound.
    #[instrument(skip_all, err)]
    pub fn from_config(cfg: Config, metrics: &'static Metrics) -> eyre::Result<Self> {
        let genesis = GenesisConfig::from_path(&cfg.genesis_path)
            .wrap_err("failed loading the chain genesis configuration")?;

        let mempool = Arc::new(Mempool::new());
        let blockchain = Arc::new(
            Blockchain::from_genesis(&genesis, mempool.clone())
                .wrap_err("failed initializing the chain from genesis")?,
        );
        let state = Arc::new(
            ServiceState::new(blockchain.clone(), mempool, blockchain, genesis)
                .wrap_err("failed initializing the service state")?,
        );
        let execution_service = ExecutionServiceServer::from_arc(Arc::new(Server::new(
            state, metrics,
        )));

        let shutdown_token = CancellationToken::new();

        let grpc_addr: std::net::SocketAddr = cfg
            .grpc_addr
            .parse()
            .wrap_err("failed to parse grpc endpoint")?;
        info!(grpc_addr = grpc_addr.to_string(), "starting grpc server");
        let grpc_server_handle = tokio::task::spawn(
            tonic::transport::Server::builder()
                .add_service(execution_service.clone())
                .serve_with_shutdown(grpc_addr, shutdown_token.clone().cancelled_owned()),
        );

        let uds_server_handle = if cfg.enable_auctioneer {
            // remove a socket file left behind by a previous run
            match std::fs::remove_file(&cfg.grpc_uds_path) {
                Ok(()) => {}
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => {
                    return Err(Report::new(error)
                        .wrap_err("failed removing an existing unix domain socket file"));
                }
            }
            let listener = tokio::net::UnixListener::bind(&cfg.grpc_uds_path)
                .wrap_err("failed to bind the unix domain socket")?;
            info!(
                uds_path = cfg.grpc_uds_path,
                "starting grpc server on unix domain socket"
            );
            Some(tokio::task::spawn(
                tonic::transport::Server::builder()
                    .add_service(execution_service)
                    .serve_with_incoming_shutdown(
                        UnixListenerStream::new(listener),
                        shutdown_token.clone().cancelled_owned(),
                    ),
            ))
        } else {
            None
        };

        let signal_receiver = spawn_signal_handler();

        Ok(Self {
            grpc_server_handle: Some(grpc_server_handle),
            uds_server_handle,
            shutdown_token,
            signal_receiver,
        })
    }

    /// Runs the node until it receives a shutdown signal or one of the
    /// server tasks exits.
    ///
    /// # Errors
    ///
    /// Returns an error if a server task exits on its own, as that only
    /// happens when serving fails.
    pub async fn run_until_stopped(mut self) -> eyre::Result<()> {
        let result = select!(
            res = self.grpc_server_handle.as_mut().expect("the gRPC server handle is set at construction and only taken here") => {
                info!("gRPC server exited without receiving shutdown signal");
                self.grpc_server_handle = None;
                flatten_serve_result(res)
                    .and_then(|()| Err(eyre!("gRPC server exited unexpectedly")))
            }
            _ = self.signal_receiver.stop_rx.changed() => {
                info!("received shutdown signal, shutting down");
                Ok(())
            }
        );
        self.shutdown().await;
        result
    }

    #[instrument(skip_all)]
    async fn shutdown(self) {
        self.shutdown_token.cancel();

        for (name, handle) in [
            ("grpc", self.grpc_server_handle),
            ("uds", self.uds_server_handle),
        ] {
            let Some(handle) = handle else {
                continue;
            };
            match timeout(GRPC_SERVER_SHUTDOWN_DURATION, handle).await {
                Ok(Ok(Ok(()))) => info!(server = name, "server stopped"),
                Ok(Ok(Err(error))) => error!(server = name, %error, "server failed"),
                Ok(Err(error)) => error!(server = name, %error, "server task panicked"),
                Err(_) => error!(server = name, "server failed to shut down in time"),
            }
        }
    }
}

fn flatten_serve_result(res: Result<ServeResult, tokio::task::JoinError>) -> eyre::Result<()> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(Report::new(error).wrap_err("gRPC server exited with error")),
        Err(error) => Err(Report::new(error).wrap_err("gRPC server task panicked")),
    }
}

struct SignalReceiver {
    stop_rx: watch::Receiver<()>,
}

fn spawn_signal_handler() -> SignalReceiver {
    let (stop_tx, stop_rx) = watch::channel(());
    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).expect(
            "setting a SIGINT listener should always work on unix; is this running on unix?",
        );
        let mut sigterm = signal(SignalKind::terminate()).expect(
            "setting a SIGTERM listener should always work on unix; is this running on unix?",
        );
        loop {
            select! {
                _ = sigint.recv() => {
                    info!("received SIGINT");
                    let _ = stop_tx.send(());
                    break;
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM");
                    let _ = stop_tx.send(());
                    break;
                }
            }
        }
    });

    SignalReceiver {
        stop_rx,
    }
}
