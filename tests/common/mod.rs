#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use kestrel_api::auth::keys::issuer_for;
use kestrel_api::auth::TokenVerifier;
use kestrel_api::config::ServerConfig;
use kestrel_api::database::{CatalogueStore, MemoryCatalogueStore};
use kestrel_api::services::{
    CatalogueError, ExternalCatalogue, FullResult, MetadataSource, SummaryResult,
};
use kestrel_api::{app, AppState};

pub const PRIVATE_KEY: &str = include_str!("../fixtures/signing_key.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/signing_key.pub.pem");
pub const AUDIENCE: &str = "kestrel-api";
pub const DOMAIN: &str = "kestrel.test";

pub const BASELINE: &[&str] = &["get:games"];
pub const ADMIN: &[&str] = &["get:games", "patch:games", "delete:games"];

/// Metadata source returning `hits` canned search results and one known detail record
pub struct FakeSource {
    pub hits: usize,
    pub details: HashMap<i64, FullResult>,
    pub search_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(hits: usize) -> Self {
        let mut details = HashMap::new();
        details.insert(1942, zelda_detail());
        Self {
            hits,
            details,
            search_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MetadataSource for FakeSource {
    async fn search(&self, text: &str, _limit: usize) -> Result<Vec<SummaryResult>, CatalogueError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if text == "upstream-down" {
            return Err(CatalogueError::Upstream("connection refused".to_string()));
        }
        Ok((1..=self.hits as i64)
            .map(|id| SummaryResult {
                id,
                name: format!("{} {}", text, id),
                summary: None,
                first_release_date: Some("2017-03-03".to_string()),
                cover_url: None,
            })
            .collect())
    }

    async fn detail(&self, external_id: i64) -> Result<Option<FullResult>, CatalogueError> {
        Ok(self.details.get(&external_id).cloned())
    }
}

pub fn zelda_detail() -> FullResult {
    FullResult {
        id: 1942,
        name: "The Legend of Zelda: Breath of the Wild".to_string(),
        summary: Some("Step into a world of discovery, exploration and adventure.".to_string()),
        first_release_date: Some("2017-03-03".to_string()),
        cover_url: Some(
            "https://images.igdb.com/igdb/image/upload/t_cover_big/co3p2d.jpg".to_string(),
        ),
        franchise: vec!["The Legend of Zelda".to_string()],
        studio: vec!["Nintendo EPD".to_string()],
    }
}

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryCatalogueStore>,
    pub source: Arc<FakeSource>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with_hits(5).await
    }

    /// Serve the real router on an ephemeral port with in-memory storage
    pub async fn start_with_hits(hits: usize) -> Result<Self> {
        init_tracing();
        let store = Arc::new(MemoryCatalogueStore::new());
        let source = Arc::new(FakeSource::new(hits));

        let verifier = TokenVerifier::from_pem(
            PUBLIC_KEY,
            "RS256",
            Some(issuer_for(DOMAIN)),
            Some(AUDIENCE.to_string()),
        )?;
        let state = AppState::new(
            store.clone() as Arc<dyn CatalogueStore>,
            verifier,
            ExternalCatalogue::new(source.clone()),
        );
        let router = app(
            state,
            &ServerConfig {
                port: 0,
                cors_origins: Vec::new(),
            },
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind test listener")?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            store,
            source,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Insert a game through the API as an authenticated user, returning its local id
    pub async fn create_game(&self, token: &str, igdb_id: i64, name: &str) -> Result<i64> {
        let res = self
            .client
            .post(self.url("/api/games"))
            .bearer_auth(token)
            .json(&json!({
                "id": igdb_id,
                "name": name,
                "summary": format!("{} summary", name),
            }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == reqwest::StatusCode::CREATED, "create failed: {}", res.status());
        let body: Value = res.json().await?;
        body["id"].as_i64().context("created game has no id")
    }
}

/// Honour RUST_LOG when debugging a failing test; silent otherwise
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn claims_for(sub: &str, permissions: &[&str]) -> Value {
    json!({
        "sub": sub,
        "permissions": permissions,
        "nickname": sub.rsplit('|').next().unwrap_or(sub),
        "aud": AUDIENCE,
        "iss": issuer_for(DOMAIN),
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
    })
}

pub fn sign(claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).expect("fixture key");
    encode(&Header::new(Algorithm::RS256), claims, &key).expect("sign token")
}

pub fn token(sub: &str, permissions: &[&str]) -> String {
    sign(&claims_for(sub, permissions))
}

/// Subjects carry `|`, which must be escaped inside a path segment
pub fn path_sub(sub: &str) -> String {
    sub.replace('|', "%7C")
}
