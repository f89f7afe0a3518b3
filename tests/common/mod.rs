//! Common test utilities for E2E tests

use std::sync::Once;

use linkgate::{AppState, config};
use tokio::net::TcpListener;

static METRICS_INIT: Once = Once::new();

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(test_config(None)).await
    }

    /// Create a test server whose token/userinfo endpoints point at a
    /// stub OAuth provider spawned alongside it
    pub async fn with_stub_provider() -> Self {
        let provider_url = spawn_stub_provider().await;
        Self::with_config(test_config(Some(&provider_url))).await
    }

    async fn with_config(config: config::AppConfig) -> Self {
        METRICS_INIT.call_once(linkgate::metrics::init_metrics);

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = linkgate::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a signed session token this server accepts
    pub fn create_test_token(&self) -> String {
        use chrono::{Duration, Utc};
        use linkgate::auth::session::{Session, create_session_token};

        let now = Utc::now();
        let session = Session {
            linkedin_id: "member-12345".to_string(),
            name: Some("Test User".to_string()),
            given_name: Some("Test".to_string()),
            family_name: Some("User".to_string()),
            email: Some("testuser@test.example.com".to_string()),
            picture_url: Some("https://example.com/avatar.png".to_string()),
            created_at: now,
            expires_at: now + Duration::days(7),
        };

        create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("Failed to create test token")
    }
}

/// Build a test configuration, optionally pointing the OAuth token and
/// userinfo endpoints at a stub provider
fn test_config(provider_url: Option<&str>) -> config::AppConfig {
    let mut linkedin = config::LinkedInOAuthConfig {
        client_id: "test-client-id".to_string(),
        client_secret: "test-client-secret".to_string(),
        scope: "openid profile email".to_string(),
        authorize_url: "https://www.linkedin.com/oauth/v2/authorization".to_string(),
        token_url: "https://www.linkedin.com/oauth/v2/accessToken".to_string(),
        userinfo_url: "https://api.linkedin.com/v2/userinfo".to_string(),
    };
    if let Some(base) = provider_url {
        linkedin.token_url = format!("{base}/token");
        linkedin.userinfo_url = format!("{base}/userinfo");
    }

    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
        },
        auth: config::AuthConfig {
            session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            session_max_age: 604800,
            post_login_redirect: "/".to_string(),
            failure_redirect: "/".to_string(),
            linkedin,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Spawn a stub OAuth provider with `/token` and `/userinfo` endpoints.
///
/// Accepts `code=good-code` with the test client credentials, answers any
/// other exchange with 400, and serves a fixed identity for the issued
/// access token.
async fn spawn_stub_provider() -> String {
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Form, Json, Router};
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct TokenForm {
        grant_type: String,
        code: String,
        redirect_uri: String,
        client_id: String,
        client_secret: String,
    }

    async fn token(Form(form): Form<TokenForm>) -> Result<Json<serde_json::Value>, StatusCode> {
        if form.client_id != "test-client-id" || form.client_secret != "test-client-secret" {
            return Err(StatusCode::UNAUTHORIZED);
        }
        if form.grant_type != "authorization_code"
            || form.code != "good-code"
            || !form.redirect_uri.ends_with("/auth/linkedin/callback")
        {
            return Err(StatusCode::BAD_REQUEST);
        }
        Ok(Json(serde_json::json!({
            "access_token": "stub-access-token",
            "expires_in": 3599,
        })))
    }

    async fn userinfo(headers: HeaderMap) -> Result<Json<serde_json::Value>, StatusCode> {
        let authorized = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "Bearer stub-access-token")
            .unwrap_or(false);
        if !authorized {
            return Err(StatusCode::UNAUTHORIZED);
        }
        Ok(Json(serde_json::json!({
            "sub": "member-12345",
            "name": "Test User",
            "given_name": "Test",
            "family_name": "User",
            "email": "testuser@test.example.com",
            "picture": "https://example.com/avatar.png",
        })))
    }

    let app = Router::new()
        .route("/token", post(token))
        .route("/userinfo", get(userinfo));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
