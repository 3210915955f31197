mod adapters;
mod application;
mod domain;
mod services;

use std::{sync::Arc, time::Duration};

use adapters::{
    repositories::{PgDonationRepository, PgSubmissionRepository},
    routes::{build_router, cors_layer},
    state::{AdminSecret, AppState, Uploads},
};
use application::{
    repositories::{DonationRepository, SubmissionRepository},
    services::UploadPipeline,
};
use domain::config::app::AppConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().expect("ERROR: invalid service configuration");
    let cors = cors_layer(config.cors_allowed_origins.as_deref())
        .expect("ERROR: invalid CORS_ALLOWED_ORIGINS");

    tracing::info!("Connecting to database...");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await
        .expect("ERROR: Failed to connect to PostgreSQL database. Check DATABASE_URL and network connectivity.");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("ERROR: Failed to run database migrations");
    tracing::info!("Database ready");

    // One HTTP client for every provider; per-request timeouts are set by each call.
    let http_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("ERROR: Failed to build HTTP client");

    let uploads = match services::create_object_storage(&http_client) {
        Ok(storage) => Uploads::Enabled(Arc::new(UploadPipeline::new(storage))),
        Err(e) => {
            tracing::warn!("Uploads disabled: {}", e);
            Uploads::Disabled(e.to_string().into())
        }
    };

    let payments = match services::create_payment_gateway(&http_client) {
        Ok(gateway) => Some(gateway),
        Err(e) => {
            tracing::warn!("Donations disabled: {}", e);
            None
        }
    };

    let shutdown = CancellationToken::new();

    let app_state = AppState {
        public_site_url: config.public_site_url.as_str().into(),
        admin_secret: AdminSecret(config.admin_secret.as_str().into()),
        uploads,
        payments,
        mailer: services::create_mailer(&http_client),
        submission_repository: Arc::new(PgSubmissionRepository::new(pool.clone()))
            as Arc<dyn SubmissionRepository>,
        donation_repository: Arc::new(PgDonationRepository::new(pool))
            as Arc<dyn DonationRepository>,
        shutdown: shutdown.clone(),
    };

    let router = build_router(app_state, cors);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("Failed to bind to port");

    tracing::info!("Server listening on 0.0.0.0:{}", config.port);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("Failed to start server");
}

/// Resolves on Ctrl+C or SIGTERM and cancels every in-flight upload.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown requested, cancelling in-flight uploads");
    shutdown.cancel();
}
