use std::net::SocketAddr;

use axum::{
    Extension, Router,
    routing::{get, put},
};

use crate::{api, api::AppState, info};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/track/{track_id}", put(api::track))
        .route("/auth/spotify/callback", get(api::callback))
        .layer(Extension(state))
}

/// Serves the notification and callback endpoints until the process exits.
pub async fn start_api_server(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, router(state)).await
}
