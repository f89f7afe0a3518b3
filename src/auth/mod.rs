//! LinkedIn OAuth authentication
//!
//! Handles:
//! - LinkedIn OAuth flow
//! - Session management
//! - Authentication middleware

mod middleware;
mod oauth;
pub mod session;

pub use middleware::{CurrentUser, MaybeUser, SESSION_COOKIE, require_auth};
pub use oauth::{OAUTH_STATE_COOKIE, auth_router};
pub use session::{Session, create_session_token, verify_session_token};
