//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::net::IpAddr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "signin.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the service
    ///
    /// # Returns
    /// Full URL like "https://signin.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Authentication configuration (LinkedIn OAuth)
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
    /// Where to send the browser after a completed sign-in
    #[serde(default = "default_redirect_path")]
    pub post_login_redirect: String,
    /// Where to send the browser when the provider rejects the sign-in
    #[serde(default = "default_redirect_path")]
    pub failure_redirect: String,
    pub linkedin: LinkedInOAuthConfig,
}

/// LinkedIn OAuth configuration
///
/// Endpoint URLs default to LinkedIn's production endpoints and are
/// overridable so tests can point the flow at a local stand-in provider.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkedInOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// OpenID Connect scopes, space separated
    #[serde(default = "default_linkedin_scope")]
    pub scope: String,
    #[serde(default = "default_linkedin_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_linkedin_token_url")]
    pub token_url: String,
    #[serde(default = "default_linkedin_userinfo_url")]
    pub userinfo_url: String,
}

fn default_redirect_path() -> String {
    "/".to_string()
}

fn default_linkedin_scope() -> String {
    "openid profile email".to_string()
}

fn default_linkedin_authorize_url() -> String {
    "https://www.linkedin.com/oauth/v2/authorization".to_string()
}

fn default_linkedin_token_url() -> String {
    "https://www.linkedin.com/oauth/v2/accessToken".to_string()
}

fn default_linkedin_userinfo_url() -> String {
    "https://api.linkedin.com/v2/userinfo".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (LINKGATE_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.protocol", "http")?
            .set_default("auth.session_max_age", 604800)?
            .set_default("auth.post_login_redirect", "/")?
            .set_default("auth.failure_redirect", "/")?
            .set_default("auth.linkedin.scope", default_linkedin_scope())?
            .set_default("auth.linkedin.authorize_url", default_linkedin_authorize_url())?
            .set_default("auth.linkedin.token_url", default_linkedin_token_url())?
            .set_default("auth.linkedin.userinfo_url", default_linkedin_userinfo_url())?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (LINKGATE_*)
            .add_source(
                Environment::with_prefix("LINKGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.linkedin.client_id.trim().is_empty()
            || self.auth.linkedin.client_secret.trim().is_empty()
        {
            return Err(crate::error::AppError::Config(
                "auth.linkedin.client_id and auth.linkedin.client_secret must be set".to_string(),
            ));
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
