use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pickleball_league::{api, cli, AppConfig, League};

#[derive(Parser)]
#[command(name = "league")]
#[command(about = "Pickleball league stats, standings and match entry")]
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
    /// Initialize the local database
    InitDb,
    /// Reset the local database to the demo league
    Seed,
    /// Show a player's profile and stats
    Player {
        #[arg(short, long)]
        id: Option<String>,
    },
    /// Show league standings
    Standings,
    /// Query a team's roster and matches
    Team {
        #[arg(short, long)]
        name: String,
    },
    /// Browse raw rows of a league table
    Table {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        limit: Option<usize>,
        /// Write the rows to a CSV file instead of printing them
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Generate a random match entry
    Autofill {
        #[arg(short, long)]
        lines: Option<usize>,
        /// Save the generated match
        #[arg(long)]
        submit: bool,
    },
}

async fn open_league(config: &AppConfig) -> Result<League> {
    Ok(League::new(config.connect_store().await?))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = AppConfig::from_env()?;

    let cli = Cli::parse();
    let today = chrono::Local::now().date_naive();

    match cli.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(config.port);
            tracing::info!("Starting league API server on port {} ({} backend)", port, config.backend);
            api::serve(&config, port).await?;
        }
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            cli::init_db(&config).await?;
        }
        Some(Commands::Seed) => {
            cli::seed(&config).await?;
        }
        Some(Commands::Player { id }) => {
            let league = open_league(&config).await?;
            let id = id.unwrap_or_else(|| config.default_player_id.clone());
            cli::show_player(&league, &id, today).await?;
        }
        Some(Commands::Standings) => {
            let league = open_league(&config).await?;
            cli::show_standings(&league).await?;
        }
        Some(Commands::Team { name }) => {
            tracing::info!("Querying team: {}", name);
            let league = open_league(&config).await?;
            cli::query_team(&league, &name).await?;
        }
        Some(Commands::Table { name, limit, csv }) => {
            let league = open_league(&config).await?;
            cli::browse_table(&league, &name, limit, csv.as_deref()).await?;
        }
        Some(Commands::Autofill { lines, submit }) => {
            let league = open_league(&config).await?;
            cli::autofill(&league, lines, submit, today).await?;
        }
        None => {
            // Default to serving
            tracing::info!("Starting league API server on port {}", config.port);
            api::serve(&config, config.port).await?;
        }
    }

    Ok(())
}
