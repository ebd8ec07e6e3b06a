mod common;

use std::sync::atomic::Ordering;

use anyhow::Result;
use common::TestServer;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn search_is_capped_at_thirty_results() -> Result<()> {
    let server = TestServer::start_with_hits(45).await?;

    let res = server
        .client
        .get(server.url("/api/search-games"))
        .query(&[("query", "zelda")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let results: Vec<Value> = res.json().await?;
    assert_eq!(results.len(), 30);
    assert_eq!(results[0]["name"], "zelda 1");
    Ok(())
}

#[tokio::test]
async fn short_or_missing_query_returns_empty_list() -> Result<()> {
    let server = TestServer::start().await?;

    for path in ["/api/search-games?query=ab", "/api/search-games?query=%20%20z%20", "/api/search-games"] {
        let results: Vec<Value> = server.client.get(server.url(path)).send().await?.json().await?;
        assert!(results.is_empty(), "{} returned {:?}", path, results);
    }
    assert_eq!(server.source.search_calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .client
        .get(server.url("/api/search-games"))
        .query(&[("query", "upstream-down")])
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

    let body: Value = res.json().await?;
    assert_eq!(body["error"], "upstream_unavailable");
    assert!(!body["message"].as_str().unwrap().contains("refused"));
    Ok(())
}

#[tokio::test]
async fn search_details_returns_mapped_record_or_not_found() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.client.get(server.url("/api/search-games-details/1942")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let detail: Value = res.json().await?;
    assert_eq!(detail["franchise"][0], "The Legend of Zelda");
    assert_eq!(detail["first_release_date"], "2017-03-03");

    let res = server.client.get(server.url("/api/search-games-details/404")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
