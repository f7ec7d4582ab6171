use std::error::Error as _;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::app::Result;
use crate::config::endpoint;
use crate::domain::Post;
use crate::fetcher::{Snapshot, SnapshotConfig, SnapshotError, SnapshotFetcher, SNAPSHOT_PATH};

#[derive(Deserialize)]
struct RawSnapshot {
    data: Option<Vec<Value>>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_offset: i64,
}

pub struct HttpSnapshotFetcher {
    client: Client,
    url: Url,
}

impl HttpSnapshotFetcher {
    pub fn new(base_url: &Url, config: &SnapshotConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("truthfeed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: endpoint(base_url, SNAPSHOT_PATH)?,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch_latest(&self) -> std::result::Result<Snapshot, SnapshotError> {
        let response = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                "HTTP Error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            );
            return Err(classify_status(status));
        }

        let body = response.bytes().await.map_err(classify_error)?;
        parse_snapshot(&body)
    }
}

pub fn parse_snapshot(body: &[u8]) -> std::result::Result<Snapshot, SnapshotError> {
    let raw: RawSnapshot =
        serde_json::from_slice(body).map_err(|e| SnapshotError::Decode(e.to_string()))?;
    let records = raw.data.ok_or(SnapshotError::NoData)?;

    let posts = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Post>(record) {
            Ok(post) => Some(post),
            Err(e) => {
                tracing::warn!("Skipping malformed snapshot post: {}", e);
                None
            }
        })
        .collect();

    Ok(Snapshot {
        posts,
        has_more: raw.has_more,
        next_offset: raw.next_offset,
    })
}

pub fn classify_status(status: StatusCode) -> SnapshotError {
    if status == StatusCode::NOT_FOUND {
        SnapshotError::NotFound
    } else if status.is_server_error() {
        SnapshotError::Server(status.as_u16())
    } else {
        SnapshotError::Status(status.as_u16())
    }
}

fn classify_error(error: reqwest::Error) -> SnapshotError {
    tracing::error!("Error fetching snapshot: {}", error);

    if error.is_timeout() {
        return SnapshotError::Timeout;
    }

    let chain = error_chain(&error);
    if chain.contains("certificate") || chain.contains("self-signed") {
        SnapshotError::Tls(chain)
    } else if error.is_connect() {
        SnapshotError::Connect(chain)
    } else if error.is_decode() {
        SnapshotError::Decode(chain)
    } else {
        SnapshotError::Network(chain)
    }
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND),
            SnapshotError::NotFound
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            SnapshotError::Server(500)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY),
            SnapshotError::Server(502)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN),
            SnapshotError::Status(403)
        ));
    }

    #[test]
    fn test_parse_snapshot() {
        let body = br#"{
            "data": [
                {"id": 2, "content": "<p>b</p>", "media_url": [], "timestamp": "", "url": ""},
                {"content": "missing id"},
                {"id": "1", "content": "<p>a</p>"}
            ],
            "has_more": true,
            "next_offset": 20
        }"#;

        let snapshot = parse_snapshot(body).unwrap();
        assert_eq!(snapshot.posts.len(), 2);
        assert_eq!(snapshot.posts[0].id.as_str(), "2");
        assert!(snapshot.has_more);
        assert_eq!(snapshot.next_offset, 20);
    }

    #[test]
    fn test_parse_snapshot_without_data() {
        assert!(matches!(
            parse_snapshot(br#"{"has_more": false}"#),
            Err(SnapshotError::NoData)
        ));
        assert!(matches!(
            parse_snapshot(b"<html>"),
            Err(SnapshotError::Decode(_))
        ));
    }

    #[test]
    fn test_snapshot_url() {
        let base = Url::parse("https://api.example.com").unwrap();
        let fetcher = HttpSnapshotFetcher::new(&base, &SnapshotConfig::default()).unwrap();
        assert_eq!(
            fetcher.url().as_str(),
            "https://api.example.com/truths/latest"
        );
    }
}
