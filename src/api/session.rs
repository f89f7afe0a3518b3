//! Session introspection endpoint

use axum::{Json, Router, routing::get};

use crate::AppState;
use crate::auth::{CurrentUser, Session};

/// GET /api/session
///
/// Returns the current session as JSON. Answers 401 when the request
/// carries no valid session token.
async fn session_info(CurrentUser(session): CurrentUser) -> Json<Session> {
    Json(session)
}

/// Create session API router
///
/// Authentication is applied by the top-level router composition.
pub fn session_router() -> Router<AppState> {
    Router::new().route("/session", get(session_info))
}
