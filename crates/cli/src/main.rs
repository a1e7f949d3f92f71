//! outreach — campaign dispatch service over a WhatsApp-style provider.

use std::{net::SocketAddr, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    sqlx::sqlite::SqlitePoolOptions,
    tracing::info,
    tracing_subscriber::EnvFilter,
};

use {
    outreach_gateway::{GatewayConfig, state::AppState},
    outreach_provider::EvolutionClient,
};

#[derive(Parser)]
#[command(name = "outreach", version, about = "Campaign dispatch service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway and campaign engine.
    Serve {
        /// Address to bind to.
        #[arg(long, env = "OUTREACH_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// SQLite database URL.
        #[arg(
            long,
            env = "OUTREACH_DATABASE_URL",
            default_value = "sqlite://outreach.db?mode=rwc"
        )]
        database_url: String,

        /// Base URL of the messaging provider API.
        #[arg(long, env = "OUTREACH_PROVIDER_URL")]
        provider_url: String,

        /// Global API key for the messaging provider.
        #[arg(long, env = "OUTREACH_PROVIDER_API_KEY", hide_env_values = true)]
        provider_api_key: String,
    },
    /// Run database migrations and exit.
    Migrate {
        #[arg(
            long,
            env = "OUTREACH_DATABASE_URL",
            default_value = "sqlite://outreach.db?mode=rwc"
        )]
        database_url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            bind,
            database_url,
            provider_url,
            provider_api_key,
        } => {
            let config = GatewayConfig {
                bind_addr: bind,
                database_url,
                provider_base_url: provider_url,
                provider_api_key,
            };
            serve(config).await
        },
        Commands::Migrate { database_url } => {
            let pool = connect(&database_url).await?;
            run_migrations(&pool).await?;
            info!("migrations applied");
            Ok(())
        },
    }
}

async fn connect(database_url: &str) -> anyhow::Result<sqlx::SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .with_context(|| format!("failed to connect to {database_url}"))
}

async fn run_migrations(pool: &sqlx::SqlitePool) -> anyhow::Result<()> {
    outreach_channels::run_migrations(pool).await?;
    outreach_campaigns::run_migrations(pool).await?;
    Ok(())
}

async fn serve(config: GatewayConfig) -> anyhow::Result<()> {
    let pool = connect(&config.database_url).await?;
    run_migrations(&pool).await?;

    let provider = Arc::new(EvolutionClient::new(
        config.provider_base_url.clone(),
        config.provider_api_key.clone(),
    ));
    let state = AppState::build(pool, provider);

    outreach_gateway::server::serve(config.bind_addr, state).await
}
