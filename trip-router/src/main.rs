use std::error::Error;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trip_router::config::RouterConfig;
use trip_router::graph::{Graph, NetworkDescription};
use trip_router::router::Router;
use trip_router::updater::{GraphUpdaterManager, JsonFileTripUpdateSource, PollingTripUpdater};
use trip_router::web::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trip_router=info")),
        )
        .init();

    let config = RouterConfig::from_env()?;

    let graph = match &config.network_path {
        Some(path) => {
            let graph = NetworkDescription::from_path(path)?.build()?;
            info!(path = %path.display(), summary = ?graph.summary(), "loaded network");
            graph
        }
        None => {
            warn!("no network configured (set TRIP_ROUTER_NETWORK); serving an empty graph");
            Graph::default()
        }
    };
    let router = Router::new(graph, config.clone());

    // Dropping the manager stops the writer, so it lives as long as the server.
    let mut updaters = GraphUpdaterManager::new(router.graph().clone())?;
    if let Some(path) = &config.trip_updates_path {
        updaters.add_updater(Box::new(PollingTripUpdater::new(
            "trip-updates",
            Box::new(JsonFileTripUpdateSource::new(path)),
            router.snapshots().clone(),
            config.poll_interval(),
        )))?;
        info!(path = %path.display(), "polling trip updates");
    }

    let app = create_router(AppState::new(router)).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "trip router listening");
    info!("  GET  /health         - Health check");
    info!("  GET  /graph/summary  - Graph counts");
    info!("  POST /plan           - Plan a trip");
    axum::serve(listener, app).await?;

    tokio::task::spawn_blocking(move || updaters.stop()).await?;
    Ok(())
}
