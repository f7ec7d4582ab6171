use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use url::Url;

use crate::app::{FeedError, Result};
use crate::stream::sse::SseDecoder;
use crate::stream::{ConnectionHandle, EventSink, Transport};

const EVENT_STREAM: &str = "text/event-stream";

/// Server-Sent Events over a streaming `reqwest` response.
pub struct HttpEventSource {
    client: Client,
}

impl HttpEventSource {
    pub fn new() -> Result<Self> {
        // No overall timeout: the response body stays open for the session.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("truthfeed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpEventSource {
    fn open(&self, url: &Url, sink: EventSink) -> ConnectionHandle {
        let request = self
            .client
            .get(url.clone())
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache");

        let task = tokio::spawn(async move {
            let reason = match stream_frames(request, &sink).await {
                Ok(()) => "stream closed by server".to_string(),
                Err(e) => e.to_string(),
            };
            sink.failed(reason);
        });

        ConnectionHandle::from_task(task)
    }
}

async fn stream_frames(request: RequestBuilder, sink: &EventSink) -> Result<()> {
    let response = request.send().await?.error_for_status()?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with(EVENT_STREAM) {
        return Err(FeedError::Other(format!(
            "unexpected content type '{}' from stream endpoint",
            content_type
        )));
    }

    if !sink.opened() {
        return Ok(());
    }

    let mut decoder = SseDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        for frame in decoder.feed(&chunk?) {
            if !sink.frame(frame) {
                return Ok(());
            }
        }
    }

    if decoder.discard_partial() {
        tracing::debug!("Dropped unterminated frame at end of stream");
    }

    Ok(())
}
