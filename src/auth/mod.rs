//! Identity verification for bearer credentials issued by the identity provider.

pub mod keys;

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use keys::TokenVerifier;

/// Verified claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity provider subject, e.g. `auth0|64f1c0...`
    pub sub: String,
    /// RBAC permissions granted to the subject
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,
}

impl Claims {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.iter().any(|p| p == permission.as_str())
    }
}

/// Named permissions understood by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Baseline tier, granted to every signed-up subject
    ReadGames,
    /// Elevated tier
    EditGames,
    /// Elevated tier
    DeleteGames,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadGames => "get:games",
            Permission::EditGames => "patch:games",
            Permission::DeleteGames => "delete:games",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header is expected")]
    MissingCredential,

    #[error("{0}")]
    MalformedHeader(&'static str),

    #[error("Token expired")]
    Expired,

    #[error("Unable to find the appropriate signing key")]
    UnknownKey,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Permission '{0}' is required")]
    MissingPermission(String),

    #[error("Key material error: {0}")]
    KeyMaterial(String),
}

/// Extract the bearer token from the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::MalformedHeader("Invalid Authorization header format"))?;

    let mut parts = auth_str.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        (Some(scheme), None, None) if scheme.eq_ignore_ascii_case("bearer") => {
            Err(AuthError::MalformedHeader("Token not found"))
        }
        (Some(scheme), _, _) if !scheme.eq_ignore_ascii_case("bearer") => Err(
            AuthError::MalformedHeader("Authorization header must start with \"Bearer\""),
        ),
        _ => Err(AuthError::MalformedHeader(
            "Authorization header must be bearer token",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredential)
        ));
        assert!(matches!(
            bearer_token(&headers_with("Basic abc")),
            Err(AuthError::MalformedHeader(_))
        ));
        assert!(matches!(
            bearer_token(&headers_with("Bearer")),
            Err(AuthError::MalformedHeader("Token not found"))
        ));
        assert!(matches!(
            bearer_token(&headers_with("Bearer a b")),
            Err(AuthError::MalformedHeader(_))
        ));
    }

    #[test]
    fn permission_names_match_provider_rbac() {
        let claims = Claims {
            sub: "auth0|1".to_string(),
            permissions: vec!["get:games".to_string()],
            nickname: None,
            email: None,
            exp: 0,
        };
        assert!(claims.has_permission(Permission::ReadGames));
        assert!(!claims.has_permission(Permission::DeleteGames));
    }
}
