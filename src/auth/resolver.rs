use async_trait::async_trait;

use super::principal::{Principal, SecurityContext};
use super::AuthError;

/// Resolves the caller of the current request.
///
/// The same resolver value is consulted by both the row-scoped query and the
/// creation auditor, so both observe the same name within one request.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn current_principal(&self) -> Option<Principal>;

    /// Name of the caller, present only when authenticated
    async fn current_principal_name(&self) -> Option<String> {
        self.current_principal()
            .await
            .filter(|principal| principal.authenticated)
            .map(|principal| principal.name)
    }

    async fn require_principal_name(&self) -> Result<String, AuthError> {
        self.current_principal_name()
            .await
            .ok_or(AuthError::Unauthenticated)
    }
}

#[async_trait]
impl IdentityResolver for SecurityContext {
    async fn current_principal(&self) -> Option<Principal> {
        self.principal().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_authenticated_name() {
        let ctx = SecurityContext::new(Principal::authenticated("isabelle"));
        assert_eq!(ctx.current_principal_name().await.as_deref(), Some("isabelle"));
        assert_eq!(ctx.require_principal_name().await, Ok("isabelle".to_string()));
    }

    #[tokio::test]
    async fn anonymous_context_is_absent() {
        let ctx = SecurityContext::anonymous();
        assert_eq!(ctx.current_principal_name().await, None);
        assert_eq!(ctx.require_principal_name().await, Err(AuthError::Unauthenticated));
    }

    #[tokio::test]
    async fn unauthenticated_principal_has_no_name() {
        let ctx = SecurityContext::new(Principal {
            name: "guest".to_string(),
            authenticated: false,
        });
        assert!(ctx.current_principal().await.is_some());
        assert_eq!(ctx.current_principal_name().await, None);
    }
}
