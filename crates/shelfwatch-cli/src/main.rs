use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "shelfwatch")]
#[command(about = "Extract live price, availability and detail facts from product pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract a page and print the result as JSON without touching storage
    Extract {
        url: String,
        /// Fetch static HTML over HTTP instead of driving Chrome
        #[arg(long)]
        http: bool,
    },
    /// Refresh a stored product from its source page
    Refresh {
        id: Uuid,
        /// Ignore the cooldown window
        #[arg(long)]
        force: bool,
        #[arg(long)]
        http: bool,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = shelfwatch_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract { url, http } => commands::run_extract(&config, &url, http).await,
        Commands::Refresh { id, force, http } => {
            commands::run_refresh(&config, id, force, http).await
        }
        Commands::Migrate => commands::run_migrate(&config).await,
    }
}
