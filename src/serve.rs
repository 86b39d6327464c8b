//! A development HTTP server for the output directory. It knows nothing about
//! posts; it serves whatever files the last build left behind.

use axum::Router;
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Serves the files under `output_directory`. Directory requests get their
/// `index.html`.
pub fn router(output_directory: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(output_directory))
        .layer(TraceLayer::new_for_http())
}

/// Serves `output_directory` on `addr` until the process receives Ctrl-C.
pub async fn serve(output_directory: &Path, addr: SocketAddr) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "serving {} at http://{}/", output_directory.display(), addr);
    axum::serve(listener, router(output_directory))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}
