//! Handlers for the trigger and override routes.

pub mod check;
pub mod slot;

use std::sync::Arc;

use crate::service::StickyService;

pub use check::*;
pub use slot::*;

/// Shared state for all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Service every route delegates to.
    pub service: Arc<StickyService>,
}

impl AppState {
    /// Create the state around a service.
    pub fn new(service: Arc<StickyService>) -> Self {
        Self { service }
    }
}
