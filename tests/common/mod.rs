#![allow(dead_code)]

use std::time::{Duration, Instant};

use address_book_api::config::DatabaseConfig;
use address_book_api::database::DatabaseManager;
use address_book_api::{app, AppState};
use anyhow::{Context, Result};
use reqwest::{header, StatusCode};
use serde_json::{json, Value};

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

/// Serve the app on a free port against a fresh database file.
///
/// The server task lives on the calling test's runtime and stops with it.
pub async fn spawn_server() -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let path = std::env::temp_dir().join(format!(
        "addressbook-it-{}-{}.db",
        std::process::id(),
        unique_suffix(port)
    ));
    let db = DatabaseManager::connect(&DatabaseConfig {
        url: format!("sqlite://{}", path.display()),
        max_connections: 4,
        connection_timeout: 5,
        busy_timeout_ms: 5_000,
    })
    .await?;
    db.migrate().await?;

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    let router = app(AppState::new(db));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let server = TestServer { port, base_url, client: reqwest::Client::new() };
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

fn unique_suffix(port: u16) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}", port, nanos)
}

impl TestServer {
    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
        Ok(res.json().await?)
    }

    pub async fn token(&self, username: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/api-token-auth"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "token request failed: {}", res.status());
        let body: Value = res.json().await?;
        body["token"].as_str().map(str::to_string).context("token missing from response")
    }

    /// Register a user and return a bearer token for it
    pub async fn user_with_token(&self, username: &str) -> Result<String> {
        self.register(username, "pass-123").await?;
        self.token(username, "pass-123").await
    }

    pub async fn create_address(&self, token: &str, body: Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/api/v1/addressbook"))
            .header(header::AUTHORIZATION, format!("Token {}", token))
            .json(&body)
            .send()
            .await?)
    }

    pub async fn get(&self, token: &str, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(self.url(path))
            .header(header::AUTHORIZATION, format!("Token {}", token))
            .send()
            .await?)
    }

    pub async fn delete(&self, token: &str, path: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .header(header::AUTHORIZATION, format!("Token {}", token))
            .send()
            .await?)
    }

    pub async fn owned_ids(&self, token: &str) -> Result<Vec<i64>> {
        let body: Value = self.get(token, "/api/v1/addressbook").await?.json().await?;
        Ok(body["results"]
            .as_array()
            .map(|rows| rows.iter().filter_map(|r| r["id"].as_i64()).collect())
            .unwrap_or_default())
    }
}

pub fn address(address1: &str) -> Value {
    json!({
        "address1": address1,
        "address2": null,
        "zip_code": "CB1 1AA",
        "city": "Cambridge",
        "country": "GBR"
    })
}
