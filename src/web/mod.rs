//! HTTP trigger surface.
//!
//! Exposes the scheduled and manual feed checks plus the moderator slot
//! overrides as JSON routes. Every successful response is a toast message.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
