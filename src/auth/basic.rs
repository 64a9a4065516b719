use axum::http::{header, HeaderMap};
use base64::{engine::general_purpose, Engine as _};

use super::AuthError;

/// Username and password decoded from an `Authorization: Basic` header
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Extract Basic credentials from the request headers
pub fn parse_basic_credentials(headers: &HeaderMap) -> Result<BasicCredentials, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AuthError::MalformedHeader("header is not valid ASCII".to_string()))?;

    // Scheme name is case-insensitive
    let (scheme, encoded) = auth_str
        .trim()
        .split_once(' ')
        .ok_or_else(|| AuthError::MalformedHeader("expected Basic scheme".to_string()))?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::MalformedHeader("expected Basic scheme".to_string()));
    }

    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AuthError::MalformedHeader(format!("invalid base64: {}", e)))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| AuthError::MalformedHeader("credentials are not UTF-8".to_string()))?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| AuthError::MalformedHeader("missing ':' separator".to_string()))?;

    Ok(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}
