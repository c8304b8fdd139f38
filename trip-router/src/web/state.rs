//! Application state for the web layer.

use crate::router::Router;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Planner over the live graph
    pub router: Router,
}

impl AppState {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}
