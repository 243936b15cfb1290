//! HTTP surface of the Lectern account service.
//!
//! The binary in `main.rs` loads configuration, builds an [`AppState`] and
//! serves [`create_app`]. Integration tests drive the same router directly.

pub mod infra;
pub mod routes;
pub mod users;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use infra::app_state::AppState;
use infra::config::CorsConfig;

/// Assemble the full router, layers included.
pub fn create_app(state: AppState) -> Router {
    let cors_layer = cors_layer(&state.config.cors);

    routes::create_api_router(state.clone())
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = if cfg.is_wildcard_included() {
        Vec::new()
    } else {
        cfg.allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect()
    };
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let headers: [HeaderName; 2] =
        [header::AUTHORIZATION, header::CONTENT_TYPE];

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::list(methods))
        .allow_headers(AllowHeaders::list(headers))
}
