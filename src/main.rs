use anyhow::{Context, Result};
use clap::Parser;
use loqa_voice_agent::{create_router, AppState, BridgeSessionFactory, Config};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "loqa-voice-agent", version, about = "Real-time voice turn-taking agent")]
struct Args {
    /// Config file path (extension optional)
    #[arg(short, long, default_value = "config/loqa-voice-agent")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    info!("Loqa Voice Agent v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("NATS: {}", cfg.nats.url);
    info!("Dialogue: {:?}", cfg.dialogue);

    let factory = BridgeSessionFactory::from_config(&cfg)?;
    let state = AppState::new(Arc::new(factory));
    let app = create_router(state.clone());

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            // Err only if the signal handler cannot be installed; shut down then too
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    state.shutdown_all().await;
    info!("All calls shut down");

    Ok(())
}
