//! Aviary server entry point.
//!
//! Builds the handler registry from the compiled-in modules, binds the HTTP
//! and relay listeners, and serves until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use aviary_server::network::{ConnectionConfig, NetworkConfig, NetworkModule, RelayConfig};
use aviary_server::service::domain::builtin_modules;
use aviary_server::service::{ModuleSource, Registry, ServiceConfig};
use aviary_server::storage::MemoryStore;
use aviary_server::traits::SightingStore;
use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Convention-routed HTTP dispatcher plus WebSocket fan-out relay.
#[derive(Debug, Parser)]
#[command(name = "aviary-server", version)]
struct Cli {
    /// Bind address for both listeners.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// HTTP port.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Relay (WebSocket) port.
    #[arg(long, env = "WS_PORT", default_value_t = 8888)]
    ws_port: u16,

    /// Host used in /explore URLs when a request carries no Host header.
    #[arg(long, env = "PUBLIC_HOST")]
    public_host: Option<String>,

    /// Comma-separated allowed CORS origins; "*" allows any.
    #[arg(
        long,
        env = "CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:5173"
    )]
    cors_origins: Vec<String>,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    /// Fail startup when a handler module exports no route table.
    #[arg(long, env = "STRICT_MODULES")]
    strict_modules: bool,

    /// Relay a producer's frames back to the producer too.
    #[arg(long, env = "ECHO_TO_SENDER")]
    echo_to_sender: bool,

    /// Per-connection outbound queue length on the relay.
    #[arg(long, env = "RELAY_QUEUE", default_value_t = 256)]
    relay_queue: usize,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Cli {
    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            public_host: self.public_host.clone(),
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            relay: RelayConfig {
                port: self.ws_port,
                echo_to_sender: self.echo_to_sender,
                connection: ConnectionConfig {
                    outbound_channel_capacity: self.relay_queue.max(1),
                    ..ConnectionConfig::default()
                },
            },
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Builds the registry, logging the failure before startup aborts.
fn build_registry(source: &dyn ModuleSource, config: &ServiceConfig) -> anyhow::Result<Registry> {
    Registry::build(source, config).map_err(|err| {
        error!(error = %err, "failed to initialize routes");
        anyhow::Error::new(err).context("failed to initialize routes")
    })
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C; shutting down");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    info!("aviary-server starting");

    let store: Arc<dyn SightingStore> = Arc::new(MemoryStore::new());
    let service_config = ServiceConfig {
        strict_modules: cli.strict_modules,
    };
    let registry = build_registry(&builtin_modules(&store), &service_config)?;

    let mut network = NetworkModule::new(cli.network_config(), Arc::new(registry));
    let ports = network.start().await?;
    info!(
        http = %format!("http://{}:{}", cli.host, ports.http),
        relay = %format!("ws://{}:{}", cli.host, ports.relay),
        "aviary-server ready"
    );

    network.serve(ctrl_c()).await
}
