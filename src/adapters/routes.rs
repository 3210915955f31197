use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    adapters::{
        controllers::{
            donation_controller::DonationController, form_controller::FormController,
            health_controller::HealthController, upload_controller::UploadController,
        },
        middleware::validate_admin_secret,
        state::AppState,
    },
    domain::config::ConfigError,
};

/// Leaves room above the 10 MiB file limit so oversized files still reach validation.
pub const UPLOAD_BODY_LIMIT: usize = 12 * 1024 * 1024;

pub fn cors_layer(allowed_origins: Option<&[String]>) -> Result<CorsLayer, ConfigError> {
    match allowed_origins {
        Some(origins) => {
            let origins = origins
                .iter()
                .map(|origin| {
                    origin.parse::<HeaderValue>().map_err(|e| ConfigError::Invalid {
                        name: "CORS_ALLOWED_ORIGINS",
                        reason: format!("{}: {}", origin, e),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any))
        }
        // Allow all origins if not specified (only for development)
        None => Ok(CorsLayer::permissive()),
    }
}

pub fn build_router(app_state: AppState, cors: CorsLayer) -> Router {
    // Routes that require the X-Admin-Secret header
    let admin_routes = Router::new()
        .route("/api/v1/health", get(HealthController::health_check))
        .route(
            "/api/v1/admin/submissions",
            get(FormController::list_submissions),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state.admin_secret.clone(),
            validate_admin_secret,
        ));

    let public_routes = Router::new()
        .route(
            "/api/v1/uploads",
            post(UploadController::upload_certification)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/v1/contact", post(FormController::submit_contact))
        .route(
            "/api/v1/partnerships",
            post(FormController::submit_partnership),
        )
        .route(
            "/api/v1/newsletter",
            post(FormController::subscribe_newsletter),
        )
        .route(
            "/api/v1/events/{event_id}/registrations",
            post(FormController::register_for_event),
        )
        .route(
            "/api/v1/donations/checkout",
            post(DonationController::create_checkout),
        )
        .route(
            "/api/v1/donations/webhook",
            post(DonationController::handle_webhook),
        );

    Router::new()
        .merge(admin_routes)
        .merge(public_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}
