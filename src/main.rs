use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsdeck::config::Config;
use newsdeck::news::NewsFetcher;
use newsdeck::routes::{self, AppState};
use newsdeck::session::Sessions;
use newsdeck::store::UserStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsdeck=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "newsdeck.toml".to_string());
    let mut config = Config::load(&config_path)?;
    if let Ok(key) = std::env::var("NEWSDATA_API_KEY") {
        config.news.api_key = key;
    }
    info!("Loaded configuration from {}", config_path);

    if config.news.api_key.trim().is_empty() {
        warn!("No news API key configured; /news will report a configuration error");
    }

    // Create app state
    let state = Arc::new(AppState {
        news: NewsFetcher::new(&config.news),
        store: UserStore::new(&config.users.base_url),
        sessions: Sessions::new(),
    });

    // Build router
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
