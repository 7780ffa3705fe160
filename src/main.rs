use anyhow::Result;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crm_monitor::api::{create_router, AppState};
use crm_monitor::monitoring::{ConnectionMonitor, SlowQueryLog};
use crm_monitor::security::{IpWhitelist, RateLimiter};
use crm_monitor::webhook::WebhookEmitter;
use crm_monitor::Config;

#[derive(Parser)]
#[command(name = "crm-monitor")]
#[command(about = "Monitoring and admission-control service for the Meridian CRM backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the monitoring API server
    Serve {
        /// Override the configured HTTP port
        #[arg(long, env = "HTTP_PORT")]
        port: Option<u16>,
    },
    /// Print the effective configuration and exit
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_monitor=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.http_port);
            serve(config, port).await
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn serve(config: Config, port: u16) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_db_connections)
        .connect_lazy(&config.database_url)?;

    let state = AppState {
        slow_queries: Arc::new(SlowQueryLog::new(config.monitoring.clone())),
        connections: Arc::new(ConnectionMonitor::new(
            pool,
            config.max_db_connections,
            &config.monitoring,
        )),
        rate_limiter: Arc::new(RateLimiter::new(config.rate_limiting.clone())),
        ip_whitelist: Arc::new(IpWhitelist::new(config.security.admin_ip_whitelist.clone())),
        webhooks: Arc::new(WebhookEmitter::new(
            config.webhooks.clone(),
            reqwest::Client::new(),
        )),
        config: Arc::new(config),
    };

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("crm-monitor listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
