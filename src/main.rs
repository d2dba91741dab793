use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use cardsense_backend::config::{AppConfig, AppPaths};
use cardsense_backend::server::router::router;
use cardsense_backend::state::AppState;
use cardsense_backend::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let paths = AppPaths::new(&config);
    logging::init(&paths);

    // Load + embed + index before binding; startup failures are fatal so
    // the service never answers from a partial corpus.
    let state = AppState::with_config(config, paths).await?;

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(state.config.server.port);
    let bind_addr = format!("127.0.0.1:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
