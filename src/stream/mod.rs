pub mod client;
pub mod config;
pub mod http;
pub mod sse;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

pub use client::StreamClient;
pub use config::StreamConfig;
pub use http::HttpEventSource;

/// Path of the push endpoint under the API base URL.
pub const STREAM_PATH: &str = "truths-sse/stream";

/// One named unit pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and frames may follow
    Opened,
    Frame(Frame),
    /// The connection broke or the server ended the stream
    Failed(String),
}

pub(crate) type TaggedEvent = (u64, TransportEvent);

/// Callback side of one opened connection.
///
/// Every event is tagged with the generation of the connection it belongs to,
/// so the client can drop events from connections it already closed.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventSink {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { generation, tx }
    }

    /// Returns false once the client is gone.
    pub fn opened(&self) -> bool {
        self.send(TransportEvent::Opened)
    }

    pub fn frame(&self, frame: Frame) -> bool {
        self.send(TransportEvent::Frame(frame))
    }

    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.send(TransportEvent::Failed(reason.into()))
    }

    fn send(&self, event: TransportEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

/// Owner of a live connection. Closing or dropping it tears the connection down.
pub struct ConnectionHandle {
    close: Option<Box<dyn FnOnce() + Send>>,
}

impl ConnectionHandle {
    pub fn new(close: impl FnOnce() + Send + 'static) -> Self {
        Self {
            close: Some(Box::new(close)),
        }
    }

    /// Handle for a connection driven by a spawned task; closing aborts the task.
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self::new(move || task.abort())
    }

    pub fn close(mut self) {
        self.run_close();
    }

    fn run_close(&mut self) {
        if let Some(close) = self.close.take() {
            close();
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.run_close();
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("open", &self.close.is_some())
            .finish()
    }
}

/// A server-push connection capability.
///
/// `open` must not block: it starts the connection and reports its lifecycle
/// through `sink`.
pub trait Transport: Send + Sync {
    fn open(&self, url: &Url, sink: EventSink) -> ConnectionHandle;
}
