//! LinkedIn OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with LinkedIn,
//! using the OpenID Connect userinfo endpoint for the identity snapshot.

use axum::{
    Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use super::middleware::{MaybeUser, SESSION_COOKIE};
use super::session::{Session, create_session_token, verify_session_token};
use crate::AppState;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::metrics::{
    LOGINS_TOTAL, SESSIONS_REVOKED_TOTAL, UPSTREAM_REQUEST_DURATION_SECONDS,
    UPSTREAM_REQUESTS_TOTAL,
};

pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// CSRF state cookies only need to survive the round trip to LinkedIn.
const STATE_COOKIE_MAX_AGE_SECS: i64 = 600;

/// Create authentication router
///
/// Routes:
/// - GET / - Home page
/// - GET /login - Login page
/// - GET /auth/linkedin - Redirect to LinkedIn
/// - GET /auth/linkedin/callback - OAuth callback
/// - GET /auth/logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home_page))
        .route("/login", get(login_page))
        .route("/auth/linkedin", get(linkedin_redirect))
        .route("/auth/linkedin/callback", get(linkedin_callback))
        .route("/auth/logout", get(logout))
}

// =============================================================================
// Pages
// =============================================================================

/// GET /
///
/// Greets a signed-in user, or offers the sign-in link.
async fn home_page(MaybeUser(session): MaybeUser) -> impl IntoResponse {
    match session {
        Some(session) => {
            let label = html_escape::encode_text(session.display_label()).into_owned();
            Html(format!(
                r#"
        <!DOCTYPE html>
        <html>
        <head><title>Linkgate</title></head>
        <body>
            <h1>Linkgate</h1>
            <p>Signed in as {label}</p>
            <a href="/auth/logout">Sign out</a>
        </body>
        </html>
    "#
            ))
        }
        None => Html(
            r#"
        <!DOCTYPE html>
        <html>
        <head><title>Linkgate</title></head>
        <body>
            <h1>Linkgate</h1>
            <a href="/auth/linkedin">Sign in with LinkedIn</a>
        </body>
        </html>
    "#
            .to_string(),
        ),
    }
}

/// GET /login
///
/// Renders a simple login page with LinkedIn sign-in button.
async fn login_page() -> impl IntoResponse {
    Html(
        r#"
        <!DOCTYPE html>
        <html>
        <head><title>Login - Linkgate</title></head>
        <body>
            <h1>Linkgate</h1>
            <p>Please sign in with LinkedIn</p>
            <a href="/auth/linkedin">Sign in with LinkedIn</a>
        </body>
        </html>
    "#,
    )
}

// =============================================================================
// LinkedIn OAuth
// =============================================================================

/// GET /auth/linkedin
///
/// Redirects user to LinkedIn authorization page.
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to LinkedIn with client_id, redirect_uri, scope, state
async fn linkedin_redirect(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let csrf_state = generate_state_token();
    let location = authorize_redirect_url(&state.config, &csrf_state);

    let cookie = Cookie::build((OAUTH_STATE_COOKIE, csrf_state))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies())
        .max_age(time::Duration::seconds(STATE_COOKIE_MAX_AGE_SECS))
        .build();

    Ok((jar.add(cookie), Redirect::to(&location)))
}

/// Query parameters from LinkedIn callback
///
/// A granted authorization carries `code` and `state`; a denial carries
/// `error` and optionally `error_description`.
#[derive(Debug, Deserialize)]
struct LinkedInCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// CSRF state token
    state: Option<String>,
    /// Provider-side denial, e.g. "user_cancelled_authorize"
    error: Option<String>,
    error_description: Option<String>,
}

/// LinkedIn token response
#[derive(Debug, Deserialize)]
struct LinkedInTokenResponse {
    access_token: String,
    #[allow(dead_code)]
    expires_in: Option<i64>,
}

/// Identity claims from LinkedIn's OpenID Connect userinfo endpoint
#[derive(Debug, Deserialize)]
struct LinkedInUserInfo {
    sub: String,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

/// GET /auth/linkedin/callback
///
/// Handles OAuth callback from LinkedIn.
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for access token
/// 3. Fetch identity claims from LinkedIn
/// 4. Create session and set cookie
/// 5. Redirect to home
///
/// Provider-side failures (denied consent, failed exchange) redirect to
/// the configured failure target instead of surfacing an error page.
/// CSRF violations are refused with 401 and never redirect.
async fn linkedin_callback(
    State(state): State<AppState>,
    Query(query): Query<LinkedInCallbackQuery>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let failure_redirect = state.config.auth.failure_redirect.clone();

    // Denied consent or other provider-side refusal
    if let Some(error) = query.error {
        tracing::warn!(
            error = %error,
            description = query.error_description.as_deref().unwrap_or(""),
            "LinkedIn authorization was not granted"
        );
        LOGINS_TOTAL.with_label_values(&["denied"]).inc();
        let jar = jar.remove(state_cookie_removal());
        return Ok((jar, Redirect::to(&failure_redirect)).into_response());
    }

    let (code, presented_state) = match (query.code, query.state) {
        (Some(code), Some(state)) => (code, state),
        _ => {
            return Err(AppError::Validation(
                "callback is missing code or state".to_string(),
            ));
        }
    };

    // 1. Verify CSRF state against the cookie set on /auth/linkedin
    match jar.get(OAUTH_STATE_COOKIE).map(|cookie| cookie.value()) {
        Some(stored) if stored == presented_state => {}
        _ => {
            tracing::warn!("Callback state does not match oauth_state cookie");
            LOGINS_TOTAL.with_label_values(&["rejected_state"]).inc();
            return Err(AppError::Unauthorized);
        }
    }

    // The state token is single-use
    let jar = jar.remove(state_cookie_removal());

    // 2. Exchange code for access token
    let token = match exchange_code(&state, &code).await {
        Ok(token) => token,
        Err(error) => {
            tracing::warn!(error = %error, "LinkedIn token exchange failed");
            LOGINS_TOTAL.with_label_values(&["exchange_failed"]).inc();
            return Ok((jar, Redirect::to(&failure_redirect)).into_response());
        }
    };

    // 3. Fetch identity claims
    let userinfo = match fetch_userinfo(&state, &token.access_token).await {
        Ok(userinfo) => userinfo,
        Err(error) => {
            tracing::warn!(error = %error, "LinkedIn userinfo fetch failed");
            LOGINS_TOTAL.with_label_values(&["userinfo_failed"]).inc();
            return Ok((jar, Redirect::to(&failure_redirect)).into_response());
        }
    };

    // 4. Create session and set cookie
    let now = Utc::now();
    let session = Session {
        linkedin_id: userinfo.sub,
        name: userinfo.name,
        given_name: userinfo.given_name,
        family_name: userinfo.family_name,
        email: userinfo.email,
        picture_url: userinfo.picture,
        created_at: now,
        expires_at: now + Duration::seconds(state.config.auth.session_max_age),
    };
    let token = create_session_token(&session, &state.config.auth.session_secret)?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.should_use_secure_cookies())
        .max_age(time::Duration::seconds(state.config.auth.session_max_age))
        .build();
    let jar = jar.add(cookie);

    tracing::info!(
        linkedin_id = %session.linkedin_id,
        user = %session.display_label(),
        "User signed in"
    );
    LOGINS_TOTAL.with_label_values(&["completed"]).inc();

    // 5. Redirect to home
    Ok((jar, Redirect::to(&state.config.auth.post_login_redirect)).into_response())
}

/// Exchange an authorization code for an access token
async fn exchange_code(
    state: &AppState,
    code: &str,
) -> Result<LinkedInTokenResponse, AppError> {
    let linkedin = &state.config.auth.linkedin;
    let redirect_uri = callback_url(&state.config);

    let timer = UPSTREAM_REQUEST_DURATION_SECONDS
        .with_label_values(&["token"])
        .start_timer();
    let response = state
        .http_client
        .post(&linkedin.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("client_id", linkedin.client_id.as_str()),
            ("client_secret", linkedin.client_secret.as_str()),
        ])
        .send()
        .await?;
    timer.observe_duration();

    let status = response.status();
    UPSTREAM_REQUESTS_TOTAL
        .with_label_values(&["token", status.as_str()])
        .inc();
    if !status.is_success() {
        return Err(AppError::OAuthExchange(format!(
            "token endpoint answered {status}"
        )));
    }

    Ok(response.json::<LinkedInTokenResponse>().await?)
}

/// Fetch OpenID Connect identity claims with the access token
async fn fetch_userinfo(
    state: &AppState,
    access_token: &str,
) -> Result<LinkedInUserInfo, AppError> {
    let linkedin = &state.config.auth.linkedin;

    let timer = UPSTREAM_REQUEST_DURATION_SECONDS
        .with_label_values(&["userinfo"])
        .start_timer();
    let response = state
        .http_client
        .get(&linkedin.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await?;
    timer.observe_duration();

    let status = response.status();
    UPSTREAM_REQUESTS_TOTAL
        .with_label_values(&["userinfo", status.as_str()])
        .inc();
    if !status.is_success() {
        return Err(AppError::OAuthExchange(format!(
            "userinfo endpoint answered {status}"
        )));
    }

    Ok(response.json::<LinkedInUserInfo>().await?)
}

// =============================================================================
// Logout
// =============================================================================

/// GET /auth/logout
///
/// Logs the departing identity, clears session cookies and redirects to
/// the site root. Always redirects, even with no (or a broken) session.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned()) {
        match verify_session_token(&token, &state.config.auth.session_secret) {
            Ok(session) => {
                tracing::info!(
                    linkedin_id = %session.linkedin_id,
                    user = %session.display_label(),
                    "User signed out"
                );
                SESSIONS_REVOKED_TOTAL.inc();
            }
            Err(_) => {
                tracing::debug!("Logout with an invalid session cookie");
            }
        }
    }

    let jar = jar
        .remove(session_cookie_removal())
        .remove(state_cookie_removal());
    (jar, Redirect::to("/"))
}

// =============================================================================
// Helpers
// =============================================================================

/// Generate a random CSRF state token
fn generate_state_token() -> String {
    use base64::{Engine as _, engine::general_purpose};
    use rand::RngCore;

    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Assemble the LinkedIn authorization URL for this sign-in attempt
fn authorize_redirect_url(config: &AppConfig, csrf_state: &str) -> String {
    let linkedin = &config.auth.linkedin;
    format!(
        "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
        linkedin.authorize_url,
        urlencoding::encode(&linkedin.client_id),
        urlencoding::encode(&callback_url(config)),
        urlencoding::encode(&linkedin.scope),
        urlencoding::encode(csrf_state),
    )
}

/// The redirect_uri registered with LinkedIn for this deployment
fn callback_url(config: &AppConfig) -> String {
    format!("{}/auth/linkedin/callback", config.server.base_url())
}

fn state_cookie_removal() -> Cookie<'static> {
    Cookie::build(OAUTH_STATE_COOKIE).path("/").build()
}

fn session_cookie_removal() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
