//! Web surface for slotbook.
//!
//! Thin axum layer that feeds requests into the auth core and translates
//! its decisions into HTTP responses.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::{ApiError, ErrorCode};
pub use handlers::{AppState, SESSION_COOKIE};
pub use router::{create_health_router, create_router};
pub use server::WebServer;
