//! Routers for the HTTP adapter.

pub mod common;
pub mod resource;

pub use common::common_routes;
pub use resource::resource_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

/// Common and resource routes with the configured request body limit.
pub fn router(state: AppState) -> Router {
    let limit = state.admin.config().body_limit;
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(resource_routes(state))
        .layer(RequestBodyLimitLayer::new(limit))
}
