use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, middleware::from_fn_with_state, routing::get, Router};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::audit::CreationAuditor;
use crate::auth::UserStore;
use crate::config::AppConfig;
use crate::database::{BookRepository, BookStore};
use crate::handlers::{protected, public};
use crate::middleware::basic_auth_middleware;

/// Shared, read-only application state. The book store is the only mutable
/// resource reachable from here.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<UserStore>,
    pub books: BookRepository,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn BookStore>) -> Self {
        let users = UserStore::from_credentials(&config.security.users);
        if users.is_empty() {
            tracing::warn!("No users configured; every book request will be rejected");
        }
        let auditor = CreationAuditor::from_config(&config.security);

        Self {
            config: Arc::new(config),
            users: Arc::new(users),
            books: BookRepository::new(store, auditor),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let api = state.config.api.clone();

    let router = Router::new()
        // Public
        .route("/health", get(public::health))
        // Protected
        .merge(book_routes(state.clone()))
        .layer(DefaultBodyLimit::max(api.max_request_size_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(api.request_timeout_secs)));

    // No cookies are issued, so there is no CSRF protection to configure
    let router = if state.config.security.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    let router = if api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn book_routes(state: AppState) -> Router<AppState> {
    use protected::books;

    Router::new()
        .route("/books", get(books::list).post(books::create))
        .route("/books/test", get(books::list_test))
        .route_layer(from_fn_with_state(state, basic_auth_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Book, BookQuery, BookStream, MemoryBookStore, NewBook, StoreError};
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use base64::{engine::general_purpose, Engine as _};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(AppState::new(AppConfig::development(), Arc::new(MemoryBookStore::new())))
    }

    fn basic(user: &str, password: &str) -> String {
        format!("Basic {}", general_purpose::STANDARD.encode(format!("{}:{}", user, password)))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn books_require_credentials() {
        let response = test_app()
            .oneshot(Request::get("/books").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"Realm\""
        );
    }

    #[tokio::test]
    async fn create_then_list_as_owner() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(
                Request::post("/books")
                    .header(header::AUTHORIZATION, basic("isabelle", "password"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"Dune","owner":"bjorn"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "id": 1, "name": "Dune", "owner": "isabelle" }));

        let response = app
            .oneshot(
                Request::get("/books")
                    .header(header::AUTHORIZATION, basic("bjorn", "password"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = test_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["store"], "memory");
    }

    /// Memory store whose inserts stall before writing
    struct SlowInsertStore {
        inner: Arc<MemoryBookStore>,
        delay: Duration,
    }

    #[async_trait]
    impl BookStore for SlowInsertStore {
        fn kind(&self) -> &'static str {
            "slow"
        }

        async fn insert(&self, book: NewBook) -> Result<Book, StoreError> {
            tokio::time::sleep(self.delay).await;
            self.inner.insert(book).await
        }

        fn find(&self, query: &BookQuery) -> BookStream {
            self.inner.find(query)
        }
    }

    #[tokio::test]
    async fn timed_out_create_writes_nothing() {
        let memory = Arc::new(MemoryBookStore::new());
        let store = SlowInsertStore {
            inner: memory.clone(),
            delay: Duration::from_secs(2),
        };
        let mut config = AppConfig::development();
        config.api.request_timeout_secs = 1;
        config.api.enable_request_logging = false;
        let app = app(AppState::new(config, Arc::new(store)));

        let response = app
            .clone()
            .oneshot(
                Request::post("/books")
                    .header(header::AUTHORIZATION, basic("isabelle", "password"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"Dune"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        // Outlast the stalled insert; the dropped handler must not finish it
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(memory.len().await, 0);

        let response = app
            .oneshot(
                Request::get("/books")
                    .header(header::AUTHORIZATION, basic("isabelle", "password"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_before_create() {
        let mut config = AppConfig::development();
        config.api.max_request_size_bytes = 64;
        let memory = Arc::new(MemoryBookStore::new());
        let app = app(AppState::new(config, memory.clone()));

        let body = json!({ "name": "x".repeat(500) }).to_string();
        let response = app
            .oneshot(
                Request::post("/books")
                    .header(header::AUTHORIZATION, basic("isabelle", "password"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_json(response).await["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(memory.len().await, 0);
    }
}
