pub mod applications;
pub mod documents;
pub mod export;
pub mod health;
pub mod review;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::middleware::{auth::require_actor, cors::api_cors};
use crate::AppState;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Full HTTP surface. Everything under `/api` requires a bearer token.
pub fn router(state: AppState, uploads_dir: &str) -> Router {
    let api = Router::new()
        .route("/api/applications", post(applications::submit_application))
        .route(
            "/api/applications/batch-status",
            post(applications::batch_update_status),
        )
        .route("/api/applications/:id", get(applications::get_application))
        .route(
            "/api/applications/:id/timeline",
            get(applications::get_timeline),
        )
        .route(
            "/api/applications/:id/status",
            patch(applications::update_status),
        )
        .route(
            "/api/applications/:id/interview",
            post(applications::schedule_interview),
        )
        .route(
            "/api/applications/:id/payment",
            post(applications::complete_payment),
        )
        .route(
            "/api/applications/:id/documents",
            post(documents::upload_document),
        )
        .route(
            "/api/schools/:school_id/applications",
            get(review::list_school_applications),
        )
        .route(
            "/api/schools/:school_id/applications/export",
            get(export::export_school_applications),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_actor,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .with_state(state)
        .layer(api_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
