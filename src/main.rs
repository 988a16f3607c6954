//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Initializes the database and seeds default settings
//! - Starts the HTTP server with graceful shutdown support

use std::env;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

mod auth;
mod database;
mod error;
mod handler;
mod middleware;
mod model;
mod payment;
mod policy;
mod route;

use database::{init_db, AppState};
use payment::SimulatedGateway;
use route::create_app;

/// Application entry point
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "library.db")
/// - `PAYMENT_DELAY_MS` - Simulated gateway processing delay (default: 2500)
#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter("bookhive=debug,tower_http=debug")
        .init();

    let port_str = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let port: u16 = port_str.parse().unwrap_or(8080);

    let db_name = env::var("DATABASE_URL").unwrap_or_else(|_| "library.db".to_string());

    // Initialize the embedded database and seed default settings
    let db = init_db(&db_name).expect("Failed to initialize database");

    let delay_ms: u64 = env::var("PAYMENT_DELAY_MS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(2500);
    let gateway = SimulatedGateway::new(Duration::from_millis(delay_ms));

    let state = AppState::new(db, Arc::new(gateway));

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.unwrap();

    println!("🚀 Server running at http://localhost:{}", port);
    println!("📂 Using database: {}", db_name);

    // The server runs until it receives SIGTERM or SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM so in-flight requests and open
/// database transactions finish before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    println!("\n🛑 Shutdown signal received, stopping server.");
}
