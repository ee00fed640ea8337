use anyhow::{Context, Result};
use clap::Parser;
use parley::integration::{AppConfig, ServicesBuilder};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Voice-enabled chat widget backend")]
struct ServerArgs {
    /// Host to bind to
    #[arg(long, env = "PARLEY_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PARLEY_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = ServerArgs::parse();

    info!("Starting Parley server");

    let config = AppConfig::from_env()?.with_bind(args.host, args.port);
    let addr = config.server.resolve().await?;
    let state = ServicesBuilder::new(config).build().await?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    parley::server::serve(listener, state, shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
