// audit/mod.rs - Creation auditor
use crate::auth::{AuthError, IdentityResolver};
use crate::config::SecurityConfig;
use crate::database::models::NewBook;

/// What to do when a book is created without a resolvable caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditPolicy {
    /// Fail the insert with `Unauthenticated`
    Reject,
    /// Persist the book with no owner
    AllowUnowned,
}

/// Pre-insert hook run exactly once per book creation, never on update
#[derive(Debug, Clone, Copy)]
pub struct CreationAuditor {
    policy: AuditPolicy,
}

impl CreationAuditor {
    pub fn new(policy: AuditPolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        let policy = if config.reject_unowned_inserts {
            AuditPolicy::Reject
        } else {
            AuditPolicy::AllowUnowned
        };
        Self::new(policy)
    }

    pub fn policy(&self) -> AuditPolicy {
        self.policy
    }

    /// Overwrite the owner with the current principal's name.
    ///
    /// The resolver is consulted once; any owner already on the book is
    /// discarded.
    pub async fn on_before_insert<R>(&self, book: NewBook, resolver: &R) -> Result<NewBook, AuthError>
    where
        R: IdentityResolver + ?Sized,
    {
        match resolver.current_principal_name().await {
            Some(name) => {
                tracing::debug!("Stamping new book with owner '{}'", name);
                Ok(book.with_owner(Some(name)))
            }
            None => match self.policy {
                AuditPolicy::Reject => {
                    tracing::warn!("Rejected book creation without an authenticated principal");
                    Err(AuthError::Unauthenticated)
                }
                AuditPolicy::AllowUnowned => {
                    tracing::warn!("Creating book without owner: no authenticated principal");
                    Ok(book.with_owner(None))
                }
            },
        }
    }
}
