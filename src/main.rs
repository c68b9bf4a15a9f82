use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinemind::{
    corpus::{self, artifacts, CORPUS_FILE},
    create_router,
    index::{ensure_index_present, BuildOptions},
    models::PreferenceProfile,
    services::{providers::OpenAiEmbeddings, query, retrieval},
    AppState, Config, VectorIndex,
};

#[derive(Parser)]
#[command(name = "cinemind")]
#[command(about = "Movie retrieval core: corpus build, vector index and candidate retrieval")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Overrides DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Overrides INDEX_DIR
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the raw CSV sources into the master dataset and embedding corpus
    BuildCorpus,
    /// Report on the master dataset and its alignment with the corpus
    Validate,
    /// Embed the corpus and persist the vector index
    BuildIndex,
    /// Raw semantic search over the index
    Search {
        /// Free text to search for
        text: String,
        #[arg(short, long, default_value_t = 5)]
        k: i64,
    },
    /// Retrieve ranked candidates for a preference profile
    Retrieve {
        /// Profile JSON, optionally wrapped in a Markdown code fence
        #[arg(long)]
        profile: String,
        #[arg(short, long)]
        k: Option<i64>,
    },
    /// Run the HTTP API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinemind=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(index_dir) = cli.index_dir {
        config.index_dir = index_dir;
    }

    match cli.command {
        Commands::BuildCorpus => {
            let data_dir = config.data_dir.clone();
            let build = tokio::task::spawn_blocking(move || corpus::build_corpus(&data_dir)).await??;
            println!(
                "Built {} movies (C = {:.3}, m = {:.1})\n  {}\n  {}",
                build.movies.len(),
                build.prior.mean_vote,
                build.prior.min_votes,
                build.master_path.display(),
                build.corpus_path.display()
            );
        }
        Commands::Validate => {
            let data_dir = config.data_dir.clone();
            let report = tokio::task::spawn_blocking(move || corpus::validate_dataset(&data_dir)).await??;
            println!("{}", report);
        }
        Commands::BuildIndex => build_index(&config).await?,
        Commands::Search { text, k } => {
            let k = retrieval::validate_k(k)?;
            let (index, provider) = load_for_queries(&config).await?;
            let results = retrieval::search_text(&index, &provider, &text, k).await?;

            println!("Top {} results for: {}\n", results.len(), text);
            for (rank, result) in results.iter().enumerate() {
                println!(
                    "{}. {} ({}) score={:.3}\n   {}\n",
                    rank + 1,
                    result.title,
                    result.year.map(|y| y.to_string()).unwrap_or_else(|| "Unknown".to_string()),
                    result.score,
                    result.snippet.replace('\n', "\n   ")
                );
            }
        }
        Commands::Retrieve { profile, k } => {
            let k = retrieval::validate_k(k.unwrap_or(config.default_k as i64))?;
            let (index, provider) = load_for_queries(&config).await?;
            let parsed = PreferenceProfile::parse(&profile);

            println!("Query: {}\n", query::query_for(&parsed));
            let candidates = retrieval::retrieve(&index, &provider, &parsed, k).await?;
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
        Commands::Serve => serve(config).await?,
    }

    Ok(())
}

async fn build_index(config: &Config) -> anyhow::Result<()> {
    let provider = OpenAiEmbeddings::from_config(config)?;
    let corpus_path = config.data_dir.join(CORPUS_FILE);
    let documents = artifacts::read_corpus(&corpus_path)
        .with_context(|| format!("run `cinemind build-corpus` first to create {}", corpus_path.display()))?;

    let index = VectorIndex::build(&provider, &documents, &config.index_dir, BuildOptions::from(config)).await?;

    println!(
        "Indexed {} documents ({} dimensions) into {}",
        index.len(),
        index.dimension(),
        config.index_dir.display()
    );
    Ok(())
}

async fn load_for_queries(config: &Config) -> anyhow::Result<(Arc<VectorIndex>, OpenAiEmbeddings)> {
    let provider = OpenAiEmbeddings::from_config(config)?;
    ensure_index_present(&config.index_dir, config.index_archive_url.as_deref()).await?;

    let index_dir = config.index_dir.clone();
    let index = tokio::task::spawn_blocking(move || VectorIndex::load(&index_dir)).await??;
    Ok((Arc::new(index), provider))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let address = config.bind_address();
    let (state, cache_writer) = AppState::initialize(config).await?;

    tracing::info!(
        documents = state.index.len(),
        index_version = %state.index.version(),
        cache_enabled = state.cache.is_some(),
        "Application state initialized"
    );

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
