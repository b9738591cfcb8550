//! Request handlers for the slotbook web surface.

mod auth;

pub use auth::{login_page, session, AppState, LoginPageQuery, SESSION_COOKIE};
