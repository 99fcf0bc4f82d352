use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tempo_genai::{OpenAiGenerator, TaskGenerator};
use tempo_store::Database;

/// Playlist scheduling service.
#[derive(Parser, Debug)]
#[command(name = "tempo", version, about)]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "TEMPO_PORT", default_value_t = 8080)]
    port: u16,

    /// SQLite database path. Defaults to ~/.tempo/tempo.db.
    #[arg(long, env = "TEMPO_DB")]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let db_path = cli.db_path.unwrap_or_else(|| {
        dirs_home().join(".tempo").join("tempo.db")
    });
    let db = Database::open(&db_path).expect("failed to open database");

    let generator: Option<Arc<dyn TaskGenerator>> = match OpenAiGenerator::from_env() {
        Ok(Some(provider)) => {
            tracing::info!("task generation enabled");
            Some(Arc::new(provider))
        }
        Ok(None) => {
            tracing::info!("OPENAI_API_KEY not set, task generation disabled");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "task generation unavailable");
            None
        }
    };

    let config = tempo_server::ServerConfig { port: cli.port };
    let handle = tempo_server::start(config, db, generator)
        .await
        .expect("failed to start server");

    tracing::info!(port = handle.port, "tempo ready");

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");

    tracing::info!("shutting down");
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
