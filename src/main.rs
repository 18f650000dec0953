use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use parking_lot::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod books;
mod config;
mod contract;
mod error;
mod ledger;
mod matching;
mod metrics;
mod models;
mod order_store;
mod scheduler;
mod settlement;
mod utils;
mod websocket;
mod world;

use crate::config::AppConfig;
use crate::scheduler::Scheduler;
use crate::websocket::WsHub;
use crate::world::World;

/// Everything an API handler or the WebSocket layer needs. `world` is the
/// one field `/reset` swaps wholesale; `scheduler` and `ws_hub` outlive a
/// reset and keep their own internal state under control.
pub struct AppState {
    pub config: AppConfig,
    pub world: Arc<RwLock<Arc<World>>>,
    pub scheduler: Arc<Scheduler>,
    pub ws_hub: Arc<WsHub>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_filter.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting freight exchange backend v{}", env!("CARGO_PKG_VERSION"));

    let world = Arc::new(RwLock::new(World::fresh(&config)));
    let scheduler = Arc::new(Scheduler::new(world.clone(), config.clone()));
    let ws_hub = Arc::new(WsHub::new());

    let state = Arc::new(AppState { config: config.clone(), world, scheduler, ws_hub });

    // Per-book streaming push (spec.md §6): ticks at <=1Hz, building a
    // fresh frame for every book currently known to the world and
    // publishing it to that book's broadcast channel. Subscribers who
    // aren't listening simply miss the frame — spec.md is explicit that
    // missed frames are not retransmitted.
    let stream_state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            let world = stream_state.world.read().clone();
            let scheduler_snapshot = stream_state.scheduler.snapshot();
            for book_id in world.books.book_ids() {
                if let Some(frame) = websocket::build_frame(&world, &book_id, &scheduler_snapshot) {
                    metrics::record_book_depth(&book_id, frame.orderbook.bids.len(), frame.orderbook.asks.len());
                    stream_state.ws_hub.publish(&book_id, frame);
                }
            }
        }
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes::create_router(state.clone()))
        .route("/ws", get(websocket::ws_upgrade))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!("Server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
