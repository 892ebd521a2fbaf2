//! stream-keys
//!
//! Issue stream keys for a self-hosted RTMP ingest server and track which
//! ones are live.
//!
//! ## Ingest server setup (nginx-rtmp)
//!
//! ```text
//! application live {
//!     live on;
//!     on_publish      http://127.0.0.1:8000/api/stream/start;
//!     on_publish_done http://127.0.0.1:8000/api/stream/stop;
//! }
//! ```
//!
//! ## Usage
//!
//!   stream-keys serve
//!   stream-keys create "Studio A" --ttl-hours 48 --host 203.0.113.7
//!   stream-keys list
//!   stream-keys delete 3

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stream_keys::{
    Acquisition, Config, JsonFileStore, ListenerGuard, NotificationServer, StreamKey,
    StreamRegistry, StreamState,
};

#[derive(Parser)]
#[command(name = "stream-keys", about = "Stream key registry for RTMP ingest")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "stream-keys.toml")]
    config: PathBuf,

    /// Registry document path override
    #[arg(short, long)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ingest callback listener (default)
    Serve {
        /// Listen address override
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
    /// Issue a new stream key
    Create {
        /// Display name
        name: String,
        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Hours until the key expires
        #[arg(short, long)]
        ttl_hours: Option<u32>,
        /// Public host of the ingest server, to print publish URLs
        #[arg(long)]
        host: Option<String>,
    },
    /// List all stream keys
    List,
    /// Show one stream key
    Show {
        key: String,
    },
    /// Delete a stream key by id
    Delete {
        id: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("stream_keys=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(data) = cli.data {
        config.registry.data_path = data;
    }

    let store = JsonFileStore::new(&config.registry.data_path);
    let registry = Arc::new(StreamRegistry::with_config(store, config.registry.clone()));

    match cli.command.unwrap_or(Command::Serve { listen: None }) {
        Command::Serve { listen } => {
            if let Some(addr) = listen {
                config.server.bind_addr = addr;
            }

            let guard = ListenerGuard::new(config.server.bind_addr);
            let server = NotificationServer::new(config.server, registry);

            tracing::info!(
                data = %config.registry.data_path.display(),
                "Starting stream key registry"
            );

            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
                tracing::info!("Shutdown signal received");
            };

            if server.run_guarded(&guard, shutdown).await? == Acquisition::AlreadyRunning {
                println!(
                    "A callback listener is already running on {}",
                    guard.addr()
                );
            }
        }
        Command::Create {
            name,
            description,
            ttl_hours,
            host,
        } => {
            let record = match ttl_hours {
                Some(ttl) => registry.create(&name, &description, ttl).await?,
                None => registry.create_default(&name, &description).await?,
            };

            println!("Stream key generated");
            println!("  id:         {}", record.id);
            println!("  name:       {}", record.name);
            println!("  stream key: {}", record.stream_key);
            println!("  expires:    {}", record.expires_at.format("%Y-%m-%d %H:%M"));

            if let Some(host) = host {
                println!();
                println!("  publish:    {}", config.ingest.publish_url(&host, &record.stream_key));
                println!("  playback:   {}", config.ingest.playback_url(&host, &record.stream_key));
            }
        }
        Command::List => {
            let snapshot = registry.list().await?;

            if snapshot.streams.is_empty() {
                println!("No streams");
            }
            for record in &snapshot.streams {
                let status = match record.state() {
                    StreamState::Live => "LIVE",
                    StreamState::Offline => "offline",
                };
                let expired = if record.is_expired() { " (expired)" } else { "" };
                println!(
                    "{:>4}  {:<14} {:<8} {}{}",
                    record.id, record.stream_key, status, record.name, expired
                );
            }

            let stats = registry.stats().await?;
            println!();
            println!(
                "{} streams, {} live, {} expired",
                stats.total_streams, stats.active_streams, stats.expired_streams
            );
        }
        Command::Show { key } => match registry.lookup(&StreamKey::new(key.as_str())).await? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => {
                eprintln!("No stream with key {key}");
                std::process::exit(1);
            }
        },
        Command::Delete { id } => {
            if registry.delete(id).await? {
                println!("Deleted stream {id}");
            } else {
                eprintln!("No stream with id {id}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
