//! Story Player API server entry point.

use std::sync::Arc;

use storyplayer_api::config::PlayerConfig;
use storyplayer_api::error::AppError;
use storyplayer_api::state::AppState;
use storyplayer_assets::file_loader::FileLoader;
use storyplayer_assets::http_loader::HttpLoader;
use storyplayer_core::clock::SystemClock;
use storyplayer_core::loader::FallbackLoader;
use storyplayer_timeline::application::command_handlers::load_name_index;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Story Player API server");

    let config = PlayerConfig::load()?;
    let addr = config.addr()?;

    let local = FileLoader::new(config.local_assets.clone());
    let remote = HttpLoader::new(&config.remote_assets, config.remote_timeout())?;
    tracing::info!(
        local = %local.root().display(),
        remote = %remote.base(),
        "asset sources configured"
    );
    let assets = Arc::new(FallbackLoader::new(Arc::new(local), Arc::new(remote)));
    let names = Arc::new(load_name_index(&assets).await);

    let app_state = AppState::new(
        Arc::new(SystemClock),
        assets,
        names,
        config.timeline_settings(),
    )
    .with_session_idle(config.session_idle());
    let app = storyplayer_api::app(app_state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
