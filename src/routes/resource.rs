//! Resource CRUD routes. The first segment is the resource's plural snake-case name.

use crate::handlers::resource::{create, delete, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/:resource", get(list).post(create))
        .route(
            "/:resource/:id",
            get(read).put(update).post(update).delete(delete),
        )
        .with_state(state)
}
