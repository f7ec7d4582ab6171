use std::sync::Arc;

use tokio::task::JoinHandle;
use url::Url;

use crate::app::controller::{spawn_feed, FeedHandle};
use crate::app::Result;
use crate::config::{endpoint, Config};
use crate::domain::Post;
use crate::fetcher::{HttpSnapshotFetcher, Snapshot, SnapshotFetcher};
use crate::stream::{HttpEventSource, StreamClient, Transport, STREAM_PATH};

pub struct AppContext {
    pub config: Config,
    pub base_url: Url,
    pub snapshot: Arc<dyn SnapshotFetcher + Send + Sync>,
    pub transport: Arc<dyn Transport>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let base_url = config.base_url()?;
        let snapshot: Arc<dyn SnapshotFetcher + Send + Sync> =
            Arc::new(HttpSnapshotFetcher::new(&base_url, &config.snapshot)?);
        let transport: Arc<dyn Transport> = Arc::new(HttpEventSource::new()?);

        Ok(Self {
            config,
            base_url,
            snapshot,
            transport,
        })
    }

    pub fn with_parts(
        config: Config,
        base_url: Url,
        snapshot: Arc<dyn SnapshotFetcher + Send + Sync>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            base_url,
            snapshot,
            transport,
        }
    }

    pub fn stream_url(&self) -> Result<Url> {
        Ok(endpoint(&self.base_url, STREAM_PATH)?)
    }

    pub fn stream_client(&self) -> Result<StreamClient> {
        Ok(StreamClient::new(
            self.transport.clone(),
            self.stream_url()?,
            self.config.stream.clone(),
        ))
    }

    pub async fn fetch_snapshot(&self) -> Result<Snapshot> {
        Ok(self.snapshot.fetch_latest().await?)
    }

    /// Fetch the snapshot, then start streaming on top of it.
    pub async fn start_feed(&self) -> Result<(FeedHandle, JoinHandle<()>)> {
        let snapshot = self.fetch_snapshot().await?;
        tracing::info!("Loaded {} posts from snapshot", snapshot.posts.len());
        self.start_feed_with(snapshot.posts)
    }

    pub fn start_feed_with(&self, initial: Vec<Post>) -> Result<(FeedHandle, JoinHandle<()>)> {
        Ok(spawn_feed(self.stream_client()?, initial))
    }
}
