//! Serves the round upload API, or imports round exports from the command
//! line.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use teamchess::{
    config::{Config, create_app},
    state::{make_pool, run_migrations},
    store::SqliteStore,
    tournaments::rounds::import::upload::{UploadRequest, upload_batch},
};

#[derive(Parser)]
struct Cli {
    /// TOML file with the server settings.
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        #[clap(long)]
        bind: Option<String>,
    },
    /// Upload round exports in order, stopping at the first failure.
    Import {
        /// Round number to use instead of the one in the file (only valid
        /// with a single file).
        #[clap(long)]
        round: Option<u32>,
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }

    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .init();

    let pool = make_pool(&config.database_url)
        .with_context(|| format!("could not open {}", config.database_url))?;
    run_migrations(&pool).map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("could not bind to {bind}"))?;
            tracing::info!(%bind, database = %config.database_url, "Listening");
            axum::serve(listener, create_app(pool, config)).await?;
        }
        Command::Import { round, files } => {
            if round.is_some() && files.len() > 1 {
                bail!("--round can only be used when importing a single file");
            }
            if config.database_url == ":memory:" {
                tracing::warn!(
                    "Importing into an in-memory database, nothing will be kept"
                );
            }

            let mut requests = Vec::with_capacity(files.len());
            for path in &files {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("could not read {}", path.display()))?;
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                requests.push(UploadRequest {
                    filename,
                    bytes,
                    round_override: round,
                });
            }

            let report = tokio::task::spawn_blocking(move || {
                let mut store = SqliteStore::new(pool.get()?);
                Ok::<_, anyhow::Error>(upload_batch(&mut store, &requests))
            })
            .await??;

            for (filename, outcome) in &report.completed {
                println!("{filename}: {}", serde_json::to_string(outcome)?);
            }
            if let Some((filename, e)) = report.failed {
                for skipped in &report.skipped {
                    eprintln!("{skipped}: skipped");
                }
                bail!("{filename}: {e}");
            }
        }
    }

    Ok(())
}
