use axum::{
    Router, middleware,
    routing::{get, patch},
};

use lectern_model::routes::v1;

use crate::{
    AppState,
    users::{auth_middleware, handlers},
};

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(v1::HEALTH, get(handlers::health))
        .merge(create_user_routes(state))
}

/// Account management; every route requires a bearer token
fn create_user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            v1::users::COLLECTION,
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(v1::users::ONLINE, get(handlers::online_users))
        .route(
            v1::users::ITEM,
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            v1::users::OPENID_UNLINK,
            patch(handlers::unlink_external_identity),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
