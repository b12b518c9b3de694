//! Documentation of the ordering platform backend.
//!
//! # General Infrastructure
//! - Storefront and admin frontends talk to this server over REST
//! - One WebSocket endpoint (`/ws`) pushes order events to every open
//!   storefront/admin session
//! - Orders are repriced server-side from the catalog; whatever totals a
//!   client computed are advisory only
//! - Relational storage and the payment gateway sit behind collaborators;
//!   this process keeps orders and coupons in memory at its boundary
//!
//! # Realtime Channel
//! - New sessions get a welcome frame and then receive every broadcast
//! - Broadcast is best-effort fan-out: a dead session is dropped from the
//!   registry without disturbing delivery to the rest
//! - The server never retries; clients own reconnection with a bounded
//!   fixed-delay retry
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run with defaults (sample catalog, port 8080).
//! ```sh
//! RUST_LOG=info cargo run -p server
//! ```
//!
//! Point at a menu file or a remote menu.
//! ```sh
//! MENU_PATH=menu.json cargo run -p server
//! MENU_URL=https://example.com/menu.json cargo run -p server
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};

use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod error;
pub mod registry;
pub mod routes;
pub mod state;
pub mod ws;

use routes::{
    create_order_handler, get_order_handler, health_handler, list_orders_handler, menu_handler,
    update_status_handler, validate_coupon_handler,
};
use state::AppState;
use ws::ws_handler;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = router(state.clone()).layer(cors);

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .unwrap();

    println!("Server shutting down...");
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/menu", get(menu_handler))
        .route("/orders", post(create_order_handler).get(list_orders_handler))
        .route("/orders/:id", get(get_order_handler))
        .route("/orders/:id/status", post(update_status_handler))
        .route("/coupons/validate", post(validate_coupon_handler))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.registry.shutdown();
}
