use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use nr_core::Config;
use nr_inference::{create_embedder, create_generator, ModelKind};
use nr_web::AppState;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if !current_number.is_empty() {
                let num = current_number
                    .parse::<u64>()
                    .map_err(|_| "Duration is too large".to_string())?;
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| "Duration is too large".to_string())?;
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // A bare number means seconds
        if !current_number.is_empty() {
            total_seconds = current_number
                .parse::<u64>()
                .ok()
                .and_then(|secs| total_seconds.checked_add(secs))
                .ok_or_else(|| "Duration is too large".to_string())?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be greater than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "News retrieval, recommendation and topic clustering", long_about = None)]
struct Cli {
    /// JSON snapshot file for the article store
    #[arg(long, env = "NR_STORE_PATH")]
    store: Option<PathBuf>,
    /// Embedding provider: cohere, openai or dummy
    #[arg(long, env = "NR_EMBEDDER", default_value = "cohere")]
    embedder: String,
    /// Text generator: openai (any compatible API such as Groq) or dummy
    #[arg(long, env = "NR_GENERATOR", default_value = "openai")]
    generator: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0:8000")]
        addr: SocketAddr,
        /// Re-ingest feeds periodically (e.g. 30m, 1h, 1h15m)
        #[arg(long)]
        refresh: Option<HumanDuration>,
    },
    /// Fetch all feeds and store the articles
    Fetch,
    /// Articles similar to the given one
    Recommend {
        id: String,
        #[arg(long)]
        k: Option<usize>,
    },
    /// Structured analysis of one article
    Analyze { id: String },
    /// Current topic clusters
    Clusters,
    /// Trending topics report
    Trending,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(path) = cli.store {
        config.storage.snapshot_path = Some(path);
    }

    let embedder_kind: ModelKind = cli.embedder.parse()?;
    let generator_kind: ModelKind = cli.generator.parse()?;
    let storage = nr_storage::create_storage(&config.storage).await?;
    let embedder = create_embedder(embedder_kind, &config.embedding, &config.retry)?;
    let generator = create_generator(generator_kind, &config.generation, &config.retry)?;
    let state = Arc::new(AppState::new(&config, storage, embedder, generator)?);

    match cli.command {
        Commands::Serve { addr, refresh } => {
            if let Some(HumanDuration(interval)) = refresh {
                let state = state.clone();
                info!("⏰ Refreshing feeds every {}s", interval.as_secs());
                tokio::spawn(async move {
                    loop {
                        match state.ingest.ingest().await {
                            Ok(report) => info!("🔄 Refresh stored {} articles", report.fetched),
                            Err(e) => error!("Refresh failed: {}", e),
                        }
                        if let Err(e) = state.storage.flush().await {
                            error!("Failed to persist store: {}", e);
                        }
                        tokio::time::sleep(interval).await;
                    }
                });
            }
            nr_web::serve(state, addr).await?;
        }
        Commands::Fetch => {
            let report = state.ingest.ingest().await?;
            state.storage.flush().await?;
            print_json(&report)?;
        }
        Commands::Recommend { id, k } => {
            let similar = state.recommender.recommend(&id, k).await?;
            print_json(&similar)?;
        }
        Commands::Analyze { id } => {
            let analysis = state.analyzer.analyze(&id).await?;
            print_json(&analysis)?;
        }
        Commands::Clusters => {
            let run = state.clusters.current().await?;
            print_json(&*run)?;
        }
        Commands::Trending => {
            let report = state.trends.trending_report().await?;
            print_json(&report)?;
        }
    }

    Ok(())
}
