mod api;
mod cli;
mod config;
mod db;
mod error;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::models::PageRequest;

#[derive(Parser)]
#[command(name = "footimport")]
#[command(about = "Imports football-data.org competitions, teams and players and serves them over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Import a competition with its teams and players
    Import {
        #[arg(short, long)]
        code: String,
    },
    /// List imported competitions
    Competitions,
    /// List the teams of a competition
    Teams {
        #[arg(short, long)]
        competition: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the players of a competition
    Players {
        #[arg(short, long)]
        competition: String,
        /// Team TLA
        #[arg(short, long)]
        team: Option<String>,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Initialize the database
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.port = port;
            }
            tracing::info!("Starting football import API server on port {}", config.port);
            api::serve(&config).await?;
        }
        Some(Commands::Import { code }) => {
            tracing::info!("Importing competition: {}", code);
            cli::import_competition(&config, &code).await?;
        }
        Some(Commands::Competitions) => {
            cli::list_competitions(&config).await?;
        }
        Some(Commands::Teams { competition, name, page, limit }) => {
            cli::list_teams(&config, &competition, name.as_deref(), PageRequest::new(page, limit)).await?;
        }
        Some(Commands::Players { competition, team, page, limit }) => {
            cli::list_players(&config, &competition, team.as_deref(), PageRequest::new(page, limit)).await?;
        }
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            let pool = db::create_pool(&config.database_url).await?;
            db::init_database(&pool).await?;
        }
        None => {
            // Default to serving
            tracing::info!("Starting football import API server on port {}", config.port);
            api::serve(&config).await?;
        }
    }

    Ok(())
}
