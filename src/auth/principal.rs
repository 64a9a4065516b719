/// Identity of the caller for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub authenticated: bool,
}

impl Principal {
    pub fn authenticated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authenticated: true,
        }
    }
}

/// Per-request security context built by the Basic auth middleware and
/// handed explicitly to the query layer and the creation auditor.
///
/// It is created fresh for every request and never shared between requests.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    principal: Option<Principal>,
}

impl SecurityContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    /// Context for a request with no caller
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }
}
