use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers;
use crate::middleware::session_auth_middleware;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(session_routes())
        .merge(job_routes())
        .merge(application_routes())
        .merge(listing_routes())
        // Session cookie required
        .merge(protected_job_routes(&state))
        // Global middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/jwt", post(handlers::session_issue))
        .route("/logout", get(handlers::session_logout))
}

fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/all-jobs", get(handlers::job_list).post(handlers::job_create))
        .route(
            "/job/:id",
            get(handlers::job_get)
                .put(handlers::job_update)
                .delete(handlers::job_delete),
        )
}

fn protected_job_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/all-jobs/:email", get(handlers::job_list_by_owner))
        .route_layer(middleware::from_fn_with_state(state.clone(), session_auth_middleware))
}

fn application_routes() -> Router<AppState> {
    Router::new()
        .route("/job-apply", post(handlers::job_apply))
        .route("/my-apply/:email", get(handlers::my_applications))
}

fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/companies", get(handlers::companies))
        .route("/blogs", get(handlers::blogs))
        .route("/blog/:id", get(handlers::blog_get))
}

/// Credentialed CORS limited to the configured front-end origins.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
}
