pub mod basic;
pub mod principal;
pub mod resolver;
pub mod users;

pub use basic::{parse_basic_credentials, BasicCredentials};
pub use principal::{Principal, SecurityContext};
pub use resolver::IdentityResolver;
pub use users::UserStore;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Missing Authorization header")]
    MissingCredentials,

    #[error("Malformed Authorization header: {0}")]
    MalformedHeader(String),

    #[error("Bad credentials")]
    BadCredentials,
}
