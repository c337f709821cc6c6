use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use folio_query::{Cursor, Direction};
use folio_service::{Config, LikeService, TokenLike, IDENTITY_FIELDS};
use folio_store::MemoryStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides `[log] level`.
const LOG_ENV: &str = "FOLIO_LOG";

const WALK_CONTRACT: &str = "0xf01105";
const WALK_USER: &str = "0xa11ce";

/// Folio token-like service.
#[derive(Parser)]
#[command(name = "folio", version, about = "Folio token-like service")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the like service until Ctrl+C
    Serve,

    /// Seed an in-memory store and print every page of one user's likes
    Walk {
        /// Number of likes to seed
        #[arg(long, default_value = "25")]
        records: u32,
        /// Page size (defaults to pagination.default_page_size)
        #[arg(long)]
        count: Option<i32>,
        /// Walk from the last page toward the first
        #[arg(long)]
        backward: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    init_tracing(&config);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve => rt.block_on(cmd_serve(config)),
        Commands::Walk {
            records,
            count,
            backward,
        } => rt.block_on(cmd_walk(config, records, count, backward)),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, folio_service::ConfigError> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

/// Logs go to stderr so `walk` output stays machine-readable.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(&config.log.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn new_service(config: Config) -> LikeService {
    let store = Arc::new(MemoryStore::new().with_unique_index(IDENTITY_FIELDS));
    LikeService::new(config, store)
}

async fn cmd_serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let service = new_service(config);
    service.start().await?;
    info!(version = %service.version(), "serving; press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    eprintln!("\nReceived shutdown signal...");

    service.close().await?;
    Ok(())
}

async fn cmd_walk(
    config: Config,
    records: u32,
    count: Option<i32>,
    backward: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let default_count = i32::try_from(config.pagination.default_page_size).unwrap_or(i32::MAX);
    let count = count.unwrap_or(default_count);
    let service = new_service(config);

    for n in 1..=records {
        let like = TokenLike::new(WALK_CONTRACT, &format!("{n:#x}"), WALK_USER);
        service.add_like(&like).await?;
    }

    let direction = Direction::from_backward(backward);
    let mut cursor = Cursor::start();
    loop {
        let page = service
            .list_user_likes(WALK_USER, &cursor, count, backward)
            .await?;
        println!("{}", serde_json::to_string(&page)?);

        match page.continuation(direction) {
            Some(next) if page.has_more(direction) => cursor = next.clone(),
            _ => break,
        }
    }
    Ok(())
}
