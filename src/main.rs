use std::fs::OpenOptions;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use elector::network::proto::raft_service_server::RaftServiceServer;
use elector::repl::Repl;
use elector::{ClusterDirectory, ConfigError, GrpcTransport, NodeId, Raft, RaftConfig, RaftServer};

fn init_logging() {
    // ELECTOR_LOG_FILE switches to plain env_logger output in that file.
    if let Ok(path) = std::env::var("ELECTOR_LOG_FILE") {
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {path}: {e}; logging to stderr"),
        }

        builder.init();
        return;
    }

    let _ = LogTracer::init();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

#[derive(Parser)]
#[command(name = "elector")]
#[command(about = "Randomized-timeout leader election over gRPC")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start one election participant
    Node {
        /// This node's id in the membership file
        #[arg(short, long)]
        id: NodeId,

        /// Membership file with one `<id> <host> <port>` line per node
        #[arg(short, long, default_value = "config.conf")]
        config: String,

        #[command(flatten)]
        timing: TimingArgs,
    },

    /// Start the operator client REPL
    Client {
        /// Node to talk to, as host:port
        #[arg(short = 'C', long)]
        connect: Option<String>,
    },
}

/// Election timing overrides, all in milliseconds.
#[derive(Args)]
struct TimingArgs {
    /// Lower bound of the randomized election timeout
    #[arg(long, default_value_t = 150)]
    election_timeout_min_ms: u64,

    /// Upper bound of the randomized election timeout
    #[arg(long, default_value_t = 300)]
    election_timeout_max_ms: u64,

    /// Period between heartbeat rounds while leader
    #[arg(long, default_value_t = 50)]
    heartbeat_interval_ms: u64,

    /// How often the election timer is checked
    #[arg(long, default_value_t = 10)]
    poll_interval_ms: u64,

    /// Transport-level deadline for calls to peers
    #[arg(long, default_value_t = 100)]
    rpc_timeout_ms: u64,
}

impl TimingArgs {
    fn apply(&self, config: &mut RaftConfig) {
        config.election_timeout_min = self.election_timeout_min_ms;
        config.election_timeout_max = self.election_timeout_max_ms;
        config.heartbeat_interval = self.heartbeat_interval_ms;
        config.poll_interval = self.poll_interval_ms;
        config.rpc_timeout = self.rpc_timeout_ms;
    }
}

fn load_node_config(
    path: &str,
    id: NodeId,
    timing: &TimingArgs,
) -> Result<(ClusterDirectory, RaftConfig), ConfigError> {
    let directory = ClusterDirectory::load(path)?;

    let mut config = RaftConfig::from_directory(&directory, id)?;
    timing.apply(&mut config);
    config.validate()?;

    Ok((directory, config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Command::Client { connect } => {
            let mut repl = Repl::new()?;
            if let Some(address) = connect {
                repl.connect_to(&address);
            }
            repl.run().await;
        }
        Command::Node { id, config, timing } => {
            let (directory, raft_config) = match load_node_config(&config, id, &timing) {
                Ok(loaded) => loaded,
                Err(e) => {
                    error!("Configuration error in {config}: {e}. Terminating node");
                    return Err(e.into());
                }
            };
            let directory = Arc::new(directory);

            let own_address = directory
                .address(id)
                .ok_or(ConfigError::UnknownNode(id))?;
            let listener = TcpListener::bind(own_address.as_str())
                .await
                .with_context(|| format!("cannot bind {own_address}"))?;

            let transport = GrpcTransport::new(&directory, id, raft_config.rpc_deadline())?;
            let raft = Raft::new(raft_config, Arc::new(transport));
            let server = RaftServer::new(raft.clone(), Arc::clone(&directory));

            info!("Server is started at {own_address}");
            let handle = raft.start();

            tonic::transport::Server::builder()
                .add_service(RaftServiceServer::new(server))
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Server ends");
                })
                .await?;

            handle.abort();
        }
    }

    Ok(())
}
