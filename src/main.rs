use std::net::SocketAddr;
use std::sync::Arc;

use vibe_list::config::{self, ProviderConfig, RuntimeMode};
use vibe_list::provider::IdentityProvider;
use vibe_list::provider::supabase::SupabaseAuthClient;
use vibe_list::routes;
use vibe_list::state::AppState;
use vibe_list::store::SessionStore;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "vibe-list exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mode = RuntimeMode::from_env();
    let provider_config = ProviderConfig::from_env(mode)?;
    let port = config::port()?;
    let bind_addr = config::bind_addr()?;
    let origin = config::app_origin();

    let provider: Arc<dyn IdentityProvider> = Arc::new(SupabaseAuthClient::new(&provider_config)?);
    tracing::info!(url = %provider_config.url, ?mode, "identity provider configured");

    let store = Arc::new(SessionStore::new(provider.clone()));
    store.start()?;

    let state = AppState::new(provider, store.clone(), origin);
    let app = routes::app(state);
    let addr = SocketAddr::new(bind_addr, port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "vibe-list listening");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    store.stop();
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
