use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::CatalogueConfig;
use crate::services::catalogue::{CatalogueError, FullResult, MetadataSource, SummaryResult};

const COVER_URL_PREFIX: &str = "https://images.igdb.com/igdb/image/upload/t_cover_big/";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct RawGame {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    first_release_date: Option<i64>,
    #[serde(default)]
    cover: Option<RawCover>,
    #[serde(default)]
    franchises: Vec<RawNamed>,
    #[serde(default)]
    involved_companies: Vec<RawInvolvedCompany>,
}

#[derive(Debug, Deserialize)]
struct RawCover {
    #[serde(default)]
    image_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawNamed {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInvolvedCompany {
    #[serde(default)]
    developer: bool,
    #[serde(default)]
    company: Option<RawNamed>,
}

/// IGDB metadata source.
///
/// An app access token is obtained through the Twitch client-credentials
/// flow for every call; nothing is cached between requests.
pub struct IgdbSource {
    http: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    api_url: String,
    token_url: String,
}

impl IgdbSource {
    pub fn new(config: &CatalogueConfig) -> Result<Self, CatalogueError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CatalogueError::Upstream(e.to_string()))?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token_url: config.token_url.clone(),
        })
    }

    async fn access_token(&self, client_id: &str) -> Result<String, CatalogueError> {
        let secret = self
            .client_secret
            .as_deref()
            .ok_or(CatalogueError::MissingCredentials)?;

        let response = self
            .http
            .post(&self.token_url)
            .query(&[
                ("client_id", client_id),
                ("client_secret", secret),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Catalogue token request returned {}", response.status());
            return Err(CatalogueError::Upstream(format!(
                "authentication failed with status {}",
                response.status()
            )));
        }

        Ok(response.json::<TokenResponse>().await?.access_token)
    }

    async fn query_games(&self, body: String) -> Result<Vec<RawGame>, CatalogueError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(CatalogueError::MissingCredentials)?;
        let token = self.access_token(client_id).await?;

        let response = self
            .http
            .post(format!("{}/games", self.api_url))
            .header("Client-ID", client_id)
            .bearer_auth(token)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Catalogue games query returned {}", status);
            return Err(CatalogueError::Upstream(format!("games query returned {}", status)));
        }

        Ok(response.json::<Vec<RawGame>>().await?)
    }
}

#[async_trait]
impl MetadataSource for IgdbSource {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<SummaryResult>, CatalogueError> {
        let games = self.query_games(search_body(text, limit)).await?;
        debug!("Catalogue search {:?} returned {} games", text, games.len());
        Ok(games.into_iter().map(to_summary).collect())
    }

    async fn detail(&self, external_id: i64) -> Result<Option<FullResult>, CatalogueError> {
        let games = self.query_games(detail_body(external_id)).await?;
        Ok(games.into_iter().next().map(to_full))
    }
}

impl std::fmt::Debug for IgdbSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgdbSource")
            .field("api_url", &self.api_url)
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn search_body(text: &str, limit: usize) -> String {
    format!(
        "search \"{}\"; fields id,name,summary,first_release_date,cover.image_id; limit {};",
        escape(text),
        limit
    )
}

fn detail_body(external_id: i64) -> String {
    format!(
        "fields id,name,summary,first_release_date,cover.image_id,franchises.name,\
         involved_companies.developer,involved_companies.company.name; where id = {};",
        external_id
    )
}

fn cover_url(cover: Option<&RawCover>) -> Option<String> {
    cover
        .and_then(|c| c.image_id.as_deref())
        .map(|image_id| format!("{}{}.jpg", COVER_URL_PREFIX, image_id))
}

fn release_date(epoch_secs: Option<i64>) -> Option<String> {
    epoch_secs
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string())
}

fn to_summary(game: RawGame) -> SummaryResult {
    SummaryResult {
        id: game.id,
        name: game.name.unwrap_or_default(),
        summary: game.summary,
        first_release_date: release_date(game.first_release_date),
        cover_url: cover_url(game.cover.as_ref()),
    }
}

fn to_full(game: RawGame) -> FullResult {
    let franchise = game.franchises.iter().filter_map(|f| f.name.clone()).collect();
    let studio = game
        .involved_companies
        .iter()
        .filter(|c| c.developer)
        .filter_map(|c| c.company.as_ref().and_then(|company| company.name.clone()))
        .collect();

    FullResult {
        id: game.id,
        name: game.name.unwrap_or_default(),
        summary: game.summary,
        first_release_date: release_date(game.first_release_date),
        cover_url: cover_url(game.cover.as_ref()),
        franchise,
        studio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_body_escapes_quotes_and_caps() {
        assert_eq!(
            search_body(r#"say "hi""#, 30),
            r#"search "say \"hi\""; fields id,name,summary,first_release_date,cover.image_id; limit 30;"#
        );
    }

    #[test]
    fn maps_cover_and_release_date() {
        let game: RawGame = serde_json::from_value(json!({
            "id": 1942,
            "name": "The Legend of Zelda: Breath of the Wild",
            "first_release_date": 1488499200,
            "cover": { "id": 1, "image_id": "co3p2d" }
        }))
        .unwrap();

        let summary = to_summary(game);
        assert_eq!(summary.first_release_date.as_deref(), Some("2017-03-03"));
        assert_eq!(
            summary.cover_url.as_deref(),
            Some("https://images.igdb.com/igdb/image/upload/t_cover_big/co3p2d.jpg")
        );
    }

    #[test]
    fn studio_keeps_only_developers() {
        let game: RawGame = serde_json::from_value(json!({
            "id": 7,
            "name": "Persona 5 Royal",
            "franchises": [{ "id": 1, "name": "Persona" }, { "id": 2 }],
            "involved_companies": [
                { "id": 10, "developer": true, "company": { "id": 100, "name": "Atlus" } },
                { "id": 11, "developer": false, "company": { "id": 101, "name": "Sega" } }
            ]
        }))
        .unwrap();

        let full = to_full(game);
        assert_eq!(full.franchise, vec!["Persona".to_string()]);
        assert_eq!(full.studio, vec!["Atlus".to_string()]);
        assert_eq!(full.cover_url, None);
        assert_eq!(full.first_release_date, None);
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        let source = IgdbSource::new(&CatalogueConfig::default()).unwrap();
        assert!(matches!(
            source.search("zelda", 30).await,
            Err(CatalogueError::MissingCredentials)
        ));
    }
}
