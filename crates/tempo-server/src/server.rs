use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use tempo_engine::PlaylistEngine;
use tempo_genai::TaskGenerator;
use tempo_store::Database;

use crate::handlers;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PlaylistEngine>,
    pub db: Database,
    /// None when no generation provider is configured; the endpoint then
    /// answers 503.
    pub generator: Option<Arc<dyn TaskGenerator>>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/playlists",
            get(handlers::list_playlists)
                .post(handlers::create_playlist)
                .delete(handlers::reset_all),
        )
        .route(
            "/playlists/{id}",
            get(handlers::get_playlist)
                .put(handlers::update_playlist)
                .delete(handlers::delete_playlist),
        )
        .route(
            "/playlists/{id}/complete",
            post(handlers::complete_playlist).delete(handlers::uncomplete_playlist),
        )
        .route("/playlists/{id}/tasks", post(handlers::append_tasks))
        .route(
            "/playlists/{id}/tasks/cleanup",
            post(handlers::cleanup_playlist),
        )
        .route(
            "/playlists/{id}/tasks/{task_id}",
            patch(handlers::toggle_task),
        )
        .route("/playlist-stats", get(handlers::playlist_stats))
        .route("/generate-tasks", post(handlers::generate_tasks))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle holding the bound port.
pub async fn start(
    config: ServerConfig,
    db: Database,
    generator: Option<Arc<dyn TaskGenerator>>,
) -> Result<ServerHandle, std::io::Error> {
    let state = AppState {
        engine: Arc::new(PlaylistEngine::new(db.clone())),
        db,
        generator,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
    })
}

/// Handle returned by `start()` — keeps the accept loop alive.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}
