pub mod http_fetcher;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Post;

pub use http_fetcher::HttpSnapshotFetcher;

/// Path of the snapshot endpoint under the API base URL.
pub const SNAPSHOT_PATH: &str = "truths/latest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Timeout for the whole snapshot request in seconds (default: 15)
    pub timeout_secs: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { timeout_secs: 15 }
    }
}

impl SnapshotConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The initial page of posts, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub posts: Vec<Post>,
    pub has_more: bool,
    pub next_offset: i64,
}

/// User-facing failure categories of the snapshot request.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Content not found")]
    NotFound,

    #[error("Server error ({0}) - please try again later")]
    Server(u16),

    #[error("Request failed ({0})")]
    Status(u16),

    #[error("Request timed out - please check your connection")]
    Timeout,

    #[error("SSL certificate verification failed - API may be using self-signed certificate")]
    Tls(String),

    #[error("Connection refused - please check if the API server is running")]
    Connect(String),

    #[error("Network error - please check your connection")]
    Network(String),

    #[error("Malformed snapshot response: {0}")]
    Decode(String),

    #[error("No data available from the API")]
    NoData,
}

#[async_trait]
pub trait SnapshotFetcher {
    async fn fetch_latest(&self) -> Result<Snapshot, SnapshotError>;
}
