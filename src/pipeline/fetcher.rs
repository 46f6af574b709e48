//! Upstream leaderboard fetcher
//!
//! ## API Reference
//!
//! Endpoint: https://publicapi.battlebit.cloud/Leaderboard/Get
//! Returns: JSON, sometimes prefixed with a UTF-8 byte-order mark, either a
//! single object or an array of partial objects that together make up one
//! leaderboard.
//!
//! Partial objects are merged field by field in array order; when two
//! elements carry the same field the later one wins.
//!
//! The fetcher does not retry. Retry policy lives in the ingest job.

use super::types::Snapshot;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_LEADERBOARD_URL: &str = "https://publicapi.battlebit.cloud/Leaderboard/Get";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("error fetching leaderboard: {0}")]
    Network(#[from] reqwest::Error),

    #[error("http request for leaderboard failed with status code: {0}")]
    HttpStatus(StatusCode),

    #[error("error decoding leaderboard: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// Source of leaderboard snapshots
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Perform one fetch and decode it into a snapshot
    async fn fetch(&self) -> Result<Snapshot, FetchError>;
}

/// Fetches snapshots over HTTP with a bounded request timeout
pub struct HttpSnapshotFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        let response = self.client.get(&self.url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::HttpStatus(response.status()));
        }

        let body = response.bytes().await?;
        decode_payload(&body)
    }
}

/// Decode a raw upstream body into a snapshot
///
/// Strips a leading byte-order mark, then accepts either one object or an
/// array of objects merged last-write-wins.
pub fn decode_payload(body: &[u8]) -> Result<Snapshot, FetchError> {
    let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
    let value: Value = serde_json::from_slice(body)?;
    let fields = merge_partials(value)?;

    Ok(Snapshot::from_fields(fields)?)
}

fn merge_partials(value: Value) -> Result<Map<String, Value>, FetchError> {
    match value {
        Value::Object(fields) => Ok(fields),
        Value::Array(parts) => {
            let mut merged = Map::new();
            for (index, part) in parts.into_iter().enumerate() {
                match part {
                    Value::Object(fields) => merged.extend(fields),
                    other => {
                        return Err(FetchError::Decode(format!(
                            "array element {} is {}, expected an object",
                            index,
                            json_kind(&other)
                        )))
                    }
                }
            }
            Ok(merged)
        }
        other => Err(FetchError::Decode(format!(
            "payload is {}, expected an object or an array of objects",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::category::Category;
    use crate::pipeline::types::{PlayerEntry, Ranking};
    use axum::{routing::get, Router};
    use tokio::net::TcpListener;

    fn players(ranking: Option<&Ranking>) -> Vec<(String, String)> {
        match ranking {
            Some(Ranking::Players(entries)) => entries
                .iter()
                .map(|PlayerEntry { name, value }| (name.clone(), value.clone()))
                .collect(),
            other => panic!("expected player ranking, got {:?}", other),
        }
    }

    #[test]
    fn test_single_object_payload() {
        let body = br#"{"MostKills":[{"Name":"alpha","Value":"10"}]}"#;

        let snapshot = decode_payload(body).unwrap();

        assert_eq!(
            players(snapshot.get(Category::Kills)),
            vec![("alpha".to_string(), "10".to_string())]
        );
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut body = UTF8_BOM.to_vec();
        body.extend_from_slice(br#"[{"MostXP":[{"Name":"a","Value":"1"}]}]"#);

        let snapshot = decode_payload(&body).unwrap();

        assert!(snapshot.contains(Category::Xp));
    }

    #[test]
    fn test_disjoint_partials_are_merged() {
        let body = br#"[
            {"MostXP":[{"Name":"a","Value":"1"}]},
            {"TopClans":[{"Clan":"Wolves","Tag":"WLF","XP":"5","MaxPlayers":"32"}]}
        ]"#;

        let snapshot = decode_payload(body).unwrap();

        assert!(snapshot.contains(Category::Xp));
        assert!(snapshot.contains(Category::Clans));
        assert!(!snapshot.contains(Category::Kills));
    }

    #[test]
    fn test_later_partial_wins_on_overlap() {
        let body = br#"[
            {"MostKills":[{"Name":"first","Value":"1"}], "MostHeals":[{"Name":"h","Value":"7"}]},
            {"MostKills":[{"Name":"second","Value":"2"},{"Name":"third","Value":"3"}]}
        ]"#;

        let snapshot = decode_payload(body).unwrap();

        assert_eq!(
            players(snapshot.get(Category::Kills)),
            vec![
                ("second".to_string(), "2".to_string()),
                ("third".to_string(), "3".to_string())
            ]
        );
        assert_eq!(players(snapshot.get(Category::Heals)).len(), 1);
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let err = decode_payload(b"[{\"MostXP\": [").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_non_object_element_is_decode_error() {
        let err = decode_payload(br#"[{"MostXP":[]}, 7]"#).unwrap_err();
        match err {
            FetchError::Decode(msg) => assert!(msg.contains("array element 1")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_array_gives_empty_snapshot() {
        let snapshot = decode_payload(b"[]").unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_odd_entry_keeps_snapshot() {
        let body = br#"[
            {"MostXP":[{"Name":"a","Value":"1"}]},
            {"MostKills":[{"Name":"b","Value":null},{"Name":"c"}]}
        ]"#;

        let snapshot = decode_payload(body).unwrap();

        assert_eq!(players(snapshot.get(Category::Xp)).len(), 1);
        assert_eq!(
            players(snapshot.get(Category::Kills)),
            vec![
                ("b".to_string(), String::new()),
                ("c".to_string(), String::new())
            ]
        );
    }

    /// Serve `router` on an ephemeral local port and return the leaderboard URL
    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/Leaderboard/Get", addr)
    }

    fn local_fetcher(url: String) -> HttpSnapshotFetcher {
        HttpSnapshotFetcher::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_non_200_is_http_status_error() {
        let url = serve(Router::new().route(
            "/Leaderboard/Get",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;

        let err = local_fetcher(url).fetch().await.unwrap_err();

        match err {
            FetchError::HttpStatus(status) => assert_eq!(status.as_u16(), 503),
            other => panic!("expected http status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_decodes_bom_prefixed_array() {
        let mut body = UTF8_BOM.to_vec();
        body.extend_from_slice(
            br#"[{"MostKills":[{"Name":"alpha","Value":"10"}]},{"MostHeals":[]}]"#,
        );
        let url = serve(Router::new().route(
            "/Leaderboard/Get",
            get(move || async move { body }),
        ))
        .await;

        let snapshot = local_fetcher(url).fetch().await.unwrap();

        assert_eq!(
            players(snapshot.get(Category::Kills)),
            vec![("alpha".to_string(), "10".to_string())]
        );
        assert!(snapshot.contains(Category::Heals));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_network_error() {
        // Grab a free port, then close it so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = local_fetcher(format!("http://{}/Leaderboard/Get", addr))
            .fetch()
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Network(_)));
    }

    #[tokio::test]
    #[ignore] // Run only when testing with live API
    async fn test_fetch_live_leaderboard() {
        let fetcher = HttpSnapshotFetcher::new(DEFAULT_LEADERBOARD_URL, Duration::from_secs(30)).unwrap();

        let snapshot = fetcher.fetch().await.unwrap();

        assert!(!snapshot.is_empty());
    }
}
