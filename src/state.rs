//! Shared application state for all routes.

use crate::admin::Admin;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub admin: Arc<Admin>,
}

impl AppState {
    pub fn new(admin: Admin) -> Self {
        AppState {
            admin: Arc::new(admin),
        }
    }
}
