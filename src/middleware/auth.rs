use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::auth::{parse_basic_credentials, AuthError, SecurityContext};
use crate::error::{insert_basic_challenge, ApiError};
use crate::server::AppState;

/// HTTP Basic authentication middleware that verifies credentials against the
/// in-memory user store and attaches the caller's `SecurityContext`
pub async fn basic_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let realm = &state.config.security.realm;

    let principal = parse_basic_credentials(request.headers())
        .and_then(|credentials| {
            state.users.authenticate(&credentials).map_err(|e| {
                tracing::warn!("Basic authentication failed for user '{}'", credentials.username);
                e
            })
        })
        .map_err(|e| {
            if !matches!(e, AuthError::BadCredentials) {
                tracing::debug!("Rejecting request to {}: {}", request.uri().path(), e);
            }
            ApiError::basic_challenge(realm.as_str(), e.to_string())
        })?;

    tracing::debug!("Authenticated principal '{}'", principal.name);

    request.extensions_mut().insert(SecurityContext::new(principal));

    let mut response = next.run(request).await;

    // Handler-side 401s (an identity that failed to resolve) know nothing of
    // the realm; challenge them the same way as a rejected header
    if response.status() == StatusCode::UNAUTHORIZED
        && !response.headers().contains_key(header::WWW_AUTHENTICATE)
    {
        insert_basic_challenge(&mut response, realm);
    }

    Ok(response)
}

/// Handlers take the security context as an explicit argument. A request that
/// never went through the auth layer gets an anonymous context, which every
/// book operation refuses.
#[async_trait]
impl<S> FromRequestParts<S> for SecurityContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .unwrap_or_else(SecurityContext::anonymous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryBookStore;
    use crate::server::AppState;
    use axum::{
        body::Body,
        http::Request,
        middleware::from_fn_with_state,
        routing::{get, post},
        Router,
    };
    use base64::{engine::general_purpose, Engine as _};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(realm: &str) -> AppState {
        let mut config = AppConfig::development();
        config.security.realm = realm.to_string();
        AppState::new(config, Arc::new(MemoryBookStore::new()))
    }

    fn isabelle() -> String {
        format!("Basic {}", general_purpose::STANDARD.encode("isabelle:password"))
    }

    // Authenticates, then drops the principal before reaching the repository
    fn router(state: AppState) -> Router {
        Router::new()
            .route(
                "/books",
                get(|State(state): State<AppState>| async move {
                    state
                        .books
                        .find_owned_by_current_principal(&SecurityContext::anonymous())
                        .await
                        .map(|_| ())
                        .map_err(ApiError::from)
                }),
            )
            .route(
                "/whoami",
                post(|ctx: SecurityContext| async move {
                    ctx.principal().map(|p| p.name.clone()).unwrap_or_default()
                }),
            )
            .route_layer(from_fn_with_state(state.clone(), basic_auth_middleware))
            .with_state(state)
    }

    #[tokio::test]
    async fn unauthenticated_from_repository_carries_the_challenge() {
        let response = router(state("Shelf"))
            .oneshot(
                Request::get("/books")
                    .header(header::AUTHORIZATION, isabelle())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"Shelf\""
        );
    }

    #[tokio::test]
    async fn authenticated_request_sees_its_principal() {
        let response = router(state("Shelf"))
            .oneshot(
                Request::post("/whoami")
                    .header(header::AUTHORIZATION, isabelle())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"isabelle");
    }
}
