use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flussonic_manager::{
    config::Config,
    database::Database,
    errors::AppError,
    sync::{SyncScheduler, SyncTrigger},
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "flussonic-manager")]
#[command(version = "0.1.0")]
#[command(about = "Administrative backend for Flussonic media servers")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file and environment)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web server and the periodic traffic sync (default)
    Serve,
    /// Run one traffic sync pass and print the report as JSON
    Sync,
    /// Create an admin user
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("flussonic_manager={},tower_http=trace", cli.log_level)
    } else {
        format!("flussonic_manager={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load_from_file(&cli.config)?;
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }
    config.validate()?;

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database ready");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, database).await,
        Command::Sync => {
            let state = AppState::new(database, &config)?;
            let report = state.sync.trigger(SyncTrigger::Manual).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::CreateAdmin { username, password } => {
            let state = AppState::new(database, &config)?;
            match state.users.create(&username, &password, true).await {
                Ok(user) => {
                    info!("Admin user '{}' created with id {}", user.username, user.id);
                    Ok(())
                }
                Err(AppError::Conflict { message }) => Err(anyhow!(message)),
                Err(e) => Err(e.into()),
            }
        }
    }
}

async fn serve(config: Config, database: Database) -> Result<()> {
    let state = AppState::new(database, &config)?;

    if config.sync.enabled {
        let scheduler = SyncScheduler::new(
            state.sync.clone(),
            config.sync.schedule()?,
            config.sync.run_on_startup,
        );
        tokio::spawn(scheduler.start());
    } else {
        warn!("Periodic traffic sync is disabled");
    }

    let server = WebServer::new(&config, state)?;
    info!("Starting web server on {}", server.addr());
    if let Err(e) = server.serve().await {
        error!("Web server error: {}", e);
        return Err(e);
    }
    Ok(())
}
