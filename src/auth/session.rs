//! Session management
//!
//! Uses HMAC-signed tokens stored in cookies.
//! No server-side session storage needed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User session data
///
/// Stored in a signed cookie. Contains the identity snapshot
/// returned by LinkedIn's OpenID Connect userinfo endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Stable LinkedIn member identifier (the `sub` claim)
    pub linkedin_id: String,
    /// Display name
    pub name: Option<String>,
    /// First name
    pub given_name: Option<String>,
    /// Last name
    pub family_name: Option<String>,
    /// Primary email address, when the `email` scope was granted
    pub email: Option<String>,
    /// Profile picture URL
    pub picture_url: Option<String>,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Best human-readable label for logs
    pub fn display_label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.linkedin_id)
    }
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_session_token(
    session: &Session,
    secret: &str,
) -> Result<String, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Serialize session to JSON
    let payload =
        serde_json::to_string(session).map_err(|e| crate::error::AppError::Internal(e.into()))?;

    // 2. Base64 encode the payload
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    // 3. Create HMAC-SHA256 signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(&signature);

    // 4. Return "{payload}.{signature}"
    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Arguments
/// * `token` - Token string to verify
/// * `secret` - HMAC secret key
///
/// # Returns
/// Decoded session if valid
///
/// # Errors
/// Returns error if signature is invalid or token is malformed
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, crate::error::AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    // 1. Split token into payload and signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return Err(crate::error::AppError::Unauthorized);
    }

    let payload_b64 = parts[0];
    let signature_b64 = parts[1];

    // 2. Verify HMAC signature
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::error::AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let expected_signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    mac.verify_slice(&expected_signature)
        .map_err(|_| crate::error::AppError::InvalidSignature)?;

    // 3. Decode and deserialize payload
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| crate::error::AppError::Unauthorized)?;

    let payload_str =
        String::from_utf8(payload_bytes).map_err(|_| crate::error::AppError::Unauthorized)?;

    let session: Session =
        serde_json::from_str(&payload_str).map_err(|_| crate::error::AppError::Unauthorized)?;

    // 4. Check if session is expired
    if session.is_expired() {
        return Err(crate::error::AppError::Unauthorized);
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "unit-test-secret-key-32-bytes!!!";

    fn test_session() -> Session {
        let now = Utc::now();
        Session {
            linkedin_id: "a1b2c3d4".to_string(),
            name: Some("Ada Lovelace".to_string()),
            given_name: Some("Ada".to_string()),
            family_name: Some("Lovelace".to_string()),
            email: Some("ada@example.com".to_string()),
            picture_url: None,
            created_at: now,
            expires_at: now + Duration::days(7),
        }
    }

    #[test]
    fn token_round_trip_preserves_identity() {
        let session = test_session();
        let token = create_session_token(&session, SECRET).unwrap();
        let decoded = verify_session_token(&token, SECRET).unwrap();

        assert_eq!(decoded.linkedin_id, session.linkedin_id);
        assert_eq!(decoded.email, session.email);
        assert_eq!(decoded.name, session.name);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let session = test_session();
        let token = create_session_token(&session, SECRET).unwrap();

        let (payload, signature) = token.split_once('.').unwrap();
        let mut forged_payload = payload.to_string();
        // Flip one character of the payload while keeping the signature
        forged_payload.replace_range(0..1, if payload.starts_with('A') { "B" } else { "A" });
        let forged = format!("{forged_payload}.{signature}");

        let error = verify_session_token(&forged, SECRET).unwrap_err();
        assert!(matches!(
            error,
            crate::error::AppError::InvalidSignature | crate::error::AppError::Unauthorized
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let session = test_session();
        let token = create_session_token(&session, SECRET).unwrap();

        let error =
            verify_session_token(&token, "another-secret-key-32-bytes-long").unwrap_err();
        assert!(matches!(error, crate::error::AppError::InvalidSignature));
    }

    #[test]
    fn expired_session_is_rejected() {
        let mut session = test_session();
        session.expires_at = Utc::now() - Duration::hours(1);
        let token = create_session_token(&session, SECRET).unwrap();

        let error = verify_session_token(&token, SECRET).unwrap_err();
        assert!(matches!(error, crate::error::AppError::Unauthorized));
    }

    #[test]
    fn malformed_token_is_rejected() {
        let error = verify_session_token("not-a-token", SECRET).unwrap_err();
        assert!(matches!(error, crate::error::AppError::Unauthorized));
    }

    #[test]
    fn display_label_falls_back_to_id() {
        let mut session = test_session();
        session.name = None;
        session.email = None;
        assert_eq!(session.display_label(), "a1b2c3d4");
    }
}
