use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use grc_nexus::config::Config;
use grc_nexus::db::GrcStorage;
use grc_nexus::router::{NexusState, nexus_router};
use grc_nexus::service::assistant::AiAssistant;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic().loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.basic().listen_addr,
        database_url = %cfg.basic().database_url,
        loglevel = %cfg.basic().loglevel,
        nexus_key = "<redacted>",
        ai_enabled = cfg.ai().is_usable(),
        ai_model = %cfg.ai().model,
        proxy = %cfg.ai().proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
    );

    let storage = GrcStorage::connect(&cfg.basic().database_url).await?;
    let assistant = AiAssistant::new(cfg.ai())?;

    let state = NexusState::new(storage, assistant, cfg.basic());
    let app = nexus_router(state);

    let addr = cfg.basic().listen_addr.as_str();
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
