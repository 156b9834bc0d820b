//! Identity provider authentication
//!
//! Handles:
//! - OAuth authorization-code flow
//! - Directory provisioning client
//! - Session management
//! - Authentication middleware

pub mod directory;
mod middleware;
mod oauth;
pub mod session;

pub use middleware::{CurrentUser, MaybeUser, SESSION_COOKIE, require_auth};
pub use oauth::auth_router;
pub use session::{Principal, Session, create_session_token, verify_session_token};
