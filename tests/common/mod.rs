use std::sync::Arc;

use anyhow::{Context, Result};
use bookshelf_api::config::AppConfig;
use bookshelf_api::database::MemoryBookStore;
use bookshelf_api::{app, AppState};

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET as the given user
    pub async fn get_as(&self, path: &str, user: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(self.url(path))
            .basic_auth(user, Some("password"))
            .send()
            .await?)
    }

    /// POST /books as the given user and return the created book
    pub async fn create_book(&self, user: &str, body: serde_json::Value) -> Result<serde_json::Value> {
        let res = self
            .client
            .post(self.url("/books"))
            .basic_auth(user, Some("password"))
            .json(&body)
            .send()
            .await?;
        anyhow::ensure!(res.status().is_success(), "create failed: {}", res.status());
        Ok(res.json().await?)
    }

    /// GET /books as the given user
    pub async fn list_books(&self, user: &str) -> Result<Vec<serde_json::Value>> {
        let res = self.get_as("/books", user).await?;
        anyhow::ensure!(res.status().is_success(), "list failed: {}", res.status());
        Ok(res.json().await?)
    }
}

/// Start the app in-process on a free port with the development users
/// (`isabelle` and `bjorn`, both with password `password`) and an empty
/// in-memory store
pub async fn spawn_server() -> Result<TestServer> {
    spawn_server_with(AppConfig::development()).await
}

pub async fn spawn_server_with(mut config: AppConfig) -> Result<TestServer> {
    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    config.server.host = "127.0.0.1".to_string();
    config.server.port = port;
    config.api.enable_request_logging = false;

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;

    let state = AppState::new(config, Arc::new(MemoryBookStore::new()));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });

    Ok(TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    })
}
