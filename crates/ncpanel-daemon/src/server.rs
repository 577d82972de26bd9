//! Dashboard web server setup and routing

use anyhow::Result;
use axum::{routing::get, Router};
use ncpanel_core::shutdown::{stopped, StopReceiver};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api;
use crate::state::ViewReceiver;

/// Handler state: a read-only handle on the panel view
#[derive(Clone)]
pub struct DashboardState {
    pub view: ViewReceiver,
}

pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/api/state", get(api::get_state))
        .route("/api/system-info", get(api::get_system_info))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the dashboard until stopped
pub async fn run(view: ViewReceiver, bind: &str, mut stop: StopReceiver) -> Result<()> {
    let app = router(DashboardState { view });
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, protocol = "HTTP", "Starting dashboard");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { stopped(&mut stop).await })
        .await?;
    info!("Dashboard stopped");
    Ok(())
}
