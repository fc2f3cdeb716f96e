//! shardkv server binary
//!
//! Sharded in-memory cache, exposed over HTTP/JSON.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use shardkv::config::ServerConfig;
use shardkv::server::Server;
use tracing_subscriber::{fmt, EnvFilter};

/// shardkv server
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0:8081")]
    socket: String,

    /// Number of shards
    #[arg(long, default_value_t = 256)]
    shards: usize,

    /// Per-shard capacity hint
    #[arg(long, default_value_t = 2048)]
    items: usize,

    /// Snapshot file path
    #[arg(long, default_value = "./var/cache.snapshot.json")]
    dump: PathBuf,

    /// Log file path, used unless --stdout is set
    #[arg(long, default_value = "./var/cache.log")]
    log: PathBuf,

    /// Log level filter
    #[arg(long = "logLevel", default_value = "info")]
    log_level: String,

    /// Log to stdout instead of --log
    #[arg(long, default_value_t = false)]
    stdout: bool,

    /// Reaper tick interval, in milliseconds
    #[arg(long, default_value_t = 1000)]
    tick_interval_ms: u64,

    /// Auth login
    #[arg(long, default_value = "")]
    login: String,

    /// Auth password
    #[arg(long, default_value = "")]
    password: String,
}

fn init_tracing(args: &Args) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if args.stdout {
        fmt().with_env_filter(filter).init();
    } else {
        if let Some(parent) = args.log.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&args.log)?;
        fmt().with_env_filter(filter).with_writer(file).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let config = ServerConfig {
        socket: args.socket,
        shards: args.shards,
        items: args.items,
        dump: args.dump,
        log: args.log,
        log_level: args.log_level,
        stdout: args.stdout,
        tick_interval: Duration::from_millis(args.tick_interval_ms),
        login: args.login,
        password: args.password,
    };

    tracing::info!("starting shardkv server on {}", config.socket);

    let server = Server::new(config);
    server
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
