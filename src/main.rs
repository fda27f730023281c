//! Blog backend server.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────────┐
//!                  │                        SAFE BLOG                         │
//!                  │                                                          │
//!   Client Request │  ┌──────────┐   ┌───────────┐   ┌────────────────────┐   │
//!   ───────────────┼─▶│  tower   │──▶│  session  │──▶│  api handlers      │   │
//!                  │  │  layers  │   │ middleware│   │  file routes       │   │
//!                  │  └──────────┘   └───────────┘   └─────────┬──────────┘   │
//!                  │                                           │              │
//!                  │              ┌────────────────────────────┼──────────┐   │
//!                  │              ▼                            ▼          ▼   │
//!                  │      ┌──────────────┐          ┌────────────┐ ┌───────┐ │
//!                  │      │ BlogStore    │          │ escape     │ │ path  │ │
//!                  │      │ → Statement  │          │ (output)   │ │ (fs)  │ │
//!                  │      │ → Database   │          └────────────┘ └───────┘ │
//!                  │      └──────────────┘                                   │
//!                  └──────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use safe_blog::config::{load_config, validate_config, BlogConfig, ConfigError};
use safe_blog::observability::{logging, metrics};
use safe_blog::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "safe-blog")]
#[command(about = "Blog backend with parameterized queries, output escaping and path containment", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BlogConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability);
    tracing::info!("safe-blog v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        public_dir = %config.storage.public_dir,
        uploads_dir = %config.storage.uploads_dir,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
