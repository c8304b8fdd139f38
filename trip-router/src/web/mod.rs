//! Web layer for the trip router.
//!
//! Provides HTTP endpoints for planning trips and inspecting the graph.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
