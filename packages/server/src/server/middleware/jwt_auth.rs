//! JWT authentication middleware.
//!
//! Session establishment lives in the external auth collaborator; this
//! layer only verifies the token it minted and attaches the caller's
//! identity to the request. Absent or invalid tokens continue as
//! anonymous.

use std::sync::Arc;

use anyhow::Result;
use axum::{middleware::Next, response::Response};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Authenticated user information from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    iss: String,
    exp: i64,
}

/// Token creation and verification.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Mint a token for a user (used by the auth collaborator and tests).
    pub fn create_token(&self, user_id: Uuid) -> Result<String> {
        let claims = Claims {
            sub: user_id,
            iss: self.issuer.clone(),
            exp: (Utc::now() + Duration::days(30)).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify a token and return the user id it names.
    pub fn verify_token(&self, token: &str) -> Result<Uuid> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims.sub)
    }
}

/// JWT authentication middleware
///
/// Extracts the JWT from the Authorization header, verifies it, and adds
/// AuthUser to request extensions. Without a valid token the request
/// continues without AuthUser (public access).
pub async fn jwt_auth_middleware(
    jwt_service: Arc<JwtService>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(user) = extract_auth_user(&request, &jwt_service) {
        debug!(user_id = %user.user_id, "Authenticated user");
        request.extensions_mut().insert(user);
    } else {
        debug!("No valid authentication token");
    }

    next.run(request).await
}

/// Extract and verify JWT token from request
fn extract_auth_user(
    request: &axum::http::Request<axum::body::Body>,
    jwt_service: &JwtService,
) -> Option<AuthUser> {
    let auth_header = request.headers().get("authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    // Handle both "Bearer <token>" and raw token
    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str);

    let user_id = jwt_service.verify_token(token).ok()?;
    Some(AuthUser { user_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_token_with_bearer() {
        let jwt_service = JwtService::new("test_secret", "test_issuer".to_string());
        let user_id = Uuid::new_v4();
        let token = jwt_service.create_token(user_id).unwrap();

        let request = axum::http::Request::builder()
            .header("authorization", format!("Bearer {}", token))
            .body(axum::body::Body::empty())
            .unwrap();

        let auth_user = extract_auth_user(&request, &jwt_service);
        assert_eq!(auth_user.unwrap().user_id, user_id);
    }

    #[test]
    fn test_extract_token_without_bearer() {
        let jwt_service = JwtService::new("test_secret", "test_issuer".to_string());
        let user_id = Uuid::new_v4();
        let token = jwt_service.create_token(user_id).unwrap();

        let request = axum::http::Request::builder()
            .header("authorization", token)
            .body(axum::body::Body::empty())
            .unwrap();

        let auth_user = extract_auth_user(&request, &jwt_service);
        assert_eq!(auth_user.unwrap().user_id, user_id);
    }

    #[test]
    fn test_no_auth_header() {
        let jwt_service = JwtService::new("test_secret", "test_issuer".to_string());
        let request = axum::http::Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();

        assert!(extract_auth_user(&request, &jwt_service).is_none());
    }

    #[test]
    fn test_invalid_token() {
        let jwt_service = JwtService::new("test_secret", "test_issuer".to_string());
        let request = axum::http::Request::builder()
            .header("authorization", "Bearer invalid_token")
            .body(axum::body::Body::empty())
            .unwrap();

        assert!(extract_auth_user(&request, &jwt_service).is_none());
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let minting = JwtService::new("test_secret", "other_issuer".to_string());
        let verifying = JwtService::new("test_secret", "test_issuer".to_string());
        let token = minting.create_token(Uuid::new_v4()).unwrap();
        assert!(verifying.verify_token(&token).is_err());
    }
}
