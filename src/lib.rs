//! Survey collection backend for the LMS research study.
//!
//! Two respondent populations (students, professors) submit questionnaire
//! answers as free-form JSON. Every accepted submission is appended to its
//! collection, after which the full corpus is re-aggregated into a snapshot
//! of summary statistics, chart distributions, and generated insights that
//! the dashboard reads back.
//!
//!
//!
//! # Architecture
//!
//! - Submissions and reads go through a small axum router, JSON in and out
//! - Collections are append-only, a record is never edited in place
//! - The aggregator is pure: collections in, snapshot out, no state between
//!   runs, so the snapshot can always be rebuilt from the raw records
//! - Persistence sits behind one trait with two backends, flat JSON files
//!   (default) or Redis when `REDIS_URL` is set
//! - Writes to one collection are serialized, two simultaneous submissions
//!   both survive and get distinct ids
//!
//!
//!
//! # Configuration
//!
//! Environment variables, all optional:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `RUST_PORT` | `3000` | Listen port |
//! | `SURVEY_DATA_DIR` | `data` | File store directory |
//! | `REDIS_URL` | unset | Switches persistence to Redis |
//! | `KEEP_ALIVE_SECS` | `300` | Keep-alive log interval |
//!
//!
//!
//! # Setup
//!
//! ```sh
//! RUST_LOG=info cargo run
//! ```
//!
//! View the docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal, time::interval};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod analysis;
pub mod config;
pub mod error;
pub mod model;
pub mod routes;
pub mod state;
pub mod store;

use routes::{
    all_data_handler, analysis_handler, export_handler, keep_alive_handler, results_handler,
    submit_professor_handler, submit_student_handler, system_status_handler,
};
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/survey/student", post(submit_student_handler))
        .route("/api/survey/professor", post(submit_professor_handler))
        .route("/api/data/all", get(all_data_handler))
        .route("/api/analysis", get(analysis_handler))
        .route("/api/results", get(results_handler))
        .route("/api/export/json", get(export_handler))
        .route("/keep-alive", get(keep_alive_handler))
        .route("/system-status", get(system_status_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    if let Err(e) = state.refresh_snapshot().await {
        warn!("Initial snapshot refresh failed: {e}");
    }

    tokio::spawn(keep_alive(state.clone()));

    info!("Starting server...");

    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn keep_alive(state: Arc<AppState>) {
    let mut ticker = interval(Duration::from_secs(state.config.keep_alive_secs));
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match state.store.counts().await {
            Ok((students, professors)) => info!(
                "Keep-alive: uptime {}s, {students} students, {professors} professors",
                state.uptime_secs()
            ),
            Err(e) => warn!("Keep-alive count failed: {e}"),
        }
    }
}

async fn shutdown_signal() {
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
}
