use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use tracing::{info, warn};

mod cache;
mod config;
mod db;
mod seed;
mod stats;
mod web;

use config::{Command, Config};
use db::Database;
use web::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    match &config.command {
        Some(Command::Seed(args)) => {
            let summary = seed::seed(&db, &args.options())?;
            info!(
                "Demo league ready: {} teams, {} players, {} matches",
                summary.teams, summary.players, summary.matches
            );
        }
        Some(Command::HeadToHead(args)) => {
            let h2h = web::load_head_to_head(&db, args.team1, args.team2, args.filter())?
                .with_context(|| format!("team {} or {} not found", args.team1, args.team2))?;
            println!("{}", serde_json::to_string_pretty(&h2h.projection)?);
        }
        Some(Command::Serve) | None => serve(config.clone(), db).await?,
    }

    Ok(())
}

async fn serve(config: Config, db: Database) -> Result<()> {
    if db.list_teams()?.is_empty() {
        warn!("No teams in the database; run `otl-stats seed` for a demo league");
    }

    let state = AppState {
        db,
        current_season: config.current_season,
        min_kda_games: config.min_kda_games,
    };
    let app = web::router(state);
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("League site listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    // Run the web server (blocks until shutdown)
    axum::serve(listener, app).await?;
    Ok(())
}
