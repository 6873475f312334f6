//! blockwire-watch binary
//!
//! Connects to a world engine, prints every event as one JSON line on stdout
//! and optionally posts a chat message.  Runs until Ctrl-C.
//!
//! ## Configuration (TOML file, then env, then flags)
//!
//! | Key                          | Default          | Description                      |
//! |------------------------------|------------------|----------------------------------|
//! | `BLOCKWIRE_ADDRESS`          | `localhost:4711` | Engine `host:port`               |
//! | `BLOCKWIRE_CLIENT_NAME`      | `blockwire`      | Name sent in the handshake       |
//! | `BLOCKWIRE_CONNECT_TIMEOUT`  | `5000`           | Connect + handshake bound (ms)   |
//! | `BLOCKWIRE_POLL_INTERVAL`    | unset            | Poll for events every N ms       |

use anyhow::{Context, Result};
use blockwire::{BlockPos, ClientConfig, Connection, WorldEvent};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "blockwire-watch", about = "Watch a world engine's events", version)]
struct Args {
    /// Optional TOML config file
    #[arg(long, env = "BLOCKWIRE_CONFIG")]
    config: Option<PathBuf>,

    /// Engine address (host:port)
    #[arg(long)]
    address: Option<String>,

    /// Name announced during the handshake
    #[arg(long)]
    client_name: Option<String>,

    /// Poll for events every N milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Post this message to chat once connected
    #[arg(long)]
    say: Option<String>,

    /// Report the block under the player once connected
    #[arg(long)]
    probe: bool,
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = &args.config {
        builder = builder.add_source(config::File::from(path.as_path()));
    }
    let mut client: ClientConfig = builder
        .add_source(config::Environment::with_prefix("BLOCKWIRE").try_parsing(true))
        .build()
        .context("reading configuration")?
        .try_deserialize()
        .context("invalid configuration")?;

    if let Some(address) = &args.address {
        client.address = address.clone();
    }
    if let Some(name) = &args.client_name {
        client.client_name = name.clone();
    }
    if let Some(ms) = args.poll_ms {
        client.poll_interval = Some(Duration::from_millis(ms));
    }
    Ok(client)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("blockwire=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    log::info!(
        "Starting blockwire-watch (address='{}', name='{}', polling={})",
        config.address,
        config.client_name,
        config.poll_interval.is_some(),
    );

    let conn = Connection::connect(&config)
        .await
        .with_context(|| format!("connecting to {}", config.address))?;

    conn.subscribe_all(|event: &WorldEvent| match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => log::warn!("Could not encode {:?}: {}", event, e),
    });

    if let Some(message) = &args.say {
        conn.post_chat(message).await?;
    }

    if args.probe {
        let tile = conn.player_tile().await?;
        let below = BlockPos::new(tile.x, tile.y - 1, tile.z);
        match conn.get_block(below).await {
            Ok(block) => log::info!("Standing on {} at {}", block.name(), below),
            Err(e) => log::warn!("Could not read block at {}: {}", below, e),
        }
    }

    // Run until shutdown or until the engine goes away
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("Shutting down");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                if !conn.is_connected() {
                    anyhow::bail!("connection to {} lost", conn.address());
                }
            }
        }
    }

    conn.disconnect().await;
    Ok(())
}
