use std::collections::HashMap;

use sha2::{Digest, Sha256};

use super::basic::BasicCredentials;
use super::principal::Principal;
use super::AuthError;
use crate::config::UserCredentials;

/// Fixed in-memory set of named users.
///
/// Secrets are kept as unsalted SHA-256 digests so the configured plaintext
/// is not held after startup. This is not a password hashing scheme; replace
/// it with a real one before storing anything that matters.
#[derive(Clone, Default)]
pub struct UserStore {
    users: HashMap<String, [u8; 32]>,
}

impl UserStore {
    pub fn from_credentials(credentials: &[UserCredentials]) -> Self {
        let users = credentials
            .iter()
            .map(|c| (c.username.clone(), digest(&c.password)))
            .collect();
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check credentials and produce the authenticated principal
    pub fn authenticate(&self, credentials: &BasicCredentials) -> Result<Principal, AuthError> {
        let expected = self
            .users
            .get(&credentials.username)
            .ok_or(AuthError::BadCredentials)?;

        if !digests_match(expected, &digest(&credentials.password)) {
            return Err(AuthError::BadCredentials);
        }

        Ok(Principal::authenticated(credentials.username.clone()))
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("users", &self.users.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn digest(secret: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(secret.as_bytes()));
    out
}

// Fixed-length comparison without early exit
fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
