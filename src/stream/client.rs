use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::domain::ConnectionState;
use crate::stream::{
    ConnectionHandle, EventSink, Frame, StreamConfig, TaggedEvent, Transport, TransportEvent,
};

/// Connection lifecycle of one push stream.
///
/// The client never interprets frames; [`next_frame`](Self::next_frame)
/// handles open/error events and the reconnect timer internally and yields
/// only frames. All state changes happen inside `&mut self` calls, so a single
/// owner sees them strictly in arrival order.
pub struct StreamClient {
    transport: Arc<dyn Transport>,
    url: Url,
    config: StreamConfig,
    state: watch::Sender<ConnectionState>,
    attempts: u32,
    generation: u64,
    connection: Option<ConnectionHandle>,
    retry_at: Option<Instant>,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    events_rx: mpsc::UnboundedReceiver<TaggedEvent>,
}

impl StreamClient {
    /// Create an idle client in the `Connecting` state. Nothing is opened
    /// until [`connect`](Self::connect).
    pub fn new(transport: Arc<dyn Transport>, url: Url, config: StreamConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Connecting);

        Self {
            transport,
            url,
            config,
            state,
            attempts: 0,
            generation: 0,
            connection: None,
            retry_at: None,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Consecutive automatic retries since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn has_pending_retry(&self) -> bool {
        self.retry_at.is_some()
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Open a fresh connection, closing any existing one first.
    pub fn connect(&mut self) {
        self.retry_at = None;
        self.close_connection();
        self.set_state(ConnectionState::Connecting);

        self.generation += 1;
        let sink = EventSink::new(self.generation, self.events_tx.clone());

        info!("Connecting to {}", self.url);
        self.connection = Some(self.transport.open(&self.url, sink));
    }

    /// Close the connection and cancel any scheduled retry.
    pub fn disconnect(&mut self) {
        self.retry_at = None;
        self.close_connection();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Reset the retry budget and connect again.
    pub fn reconnect(&mut self) {
        self.attempts = 0;
        self.connect();
    }

    /// Wait for the next frame, handling lifecycle events along the way.
    ///
    /// Cancel safe: dropping the future loses no event and keeps the timer.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let retry_at = self.retry_at;

            tokio::select! {
                event = self.events_rx.recv() => {
                    let (generation, event) = event?;
                    if let Some(frame) = self.handle_event(generation, event) {
                        return Some(frame);
                    }
                }
                _ = sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    self.retry_at = None;
                    debug!("Reconnect timer fired");
                    self.connect();
                }
            }
        }
    }

    /// Handle every event already queued without waiting.
    pub fn drain_events(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok((generation, event)) = self.events_rx.try_recv() {
            if let Some(frame) = self.handle_event(generation, event) {
                frames.push(frame);
            }
        }
        frames
    }

    fn handle_event(&mut self, generation: u64, event: TransportEvent) -> Option<Frame> {
        if generation != self.generation || self.connection.is_none() {
            debug!("Dropping event from closed connection #{}", generation);
            return None;
        }

        match event {
            TransportEvent::Opened => {
                self.attempts = 0;
                self.set_state(ConnectionState::Connected);
                info!("Stream connection established");
                None
            }
            TransportEvent::Frame(frame) => Some(frame),
            TransportEvent::Failed(reason) => {
                self.handle_error(&reason);
                None
            }
        }
    }

    fn handle_error(&mut self, reason: &str) {
        warn!("Stream connection error: {}", reason);
        self.set_state(ConnectionState::Error);
        self.close_connection();

        if self.config.auto_reconnect && self.attempts < self.config.max_reconnect_attempts {
            self.attempts += 1;
            warn!(
                "Attempting to reconnect ({}/{}) in {:?}",
                self.attempts,
                self.config.max_reconnect_attempts,
                self.config.reconnect_delay()
            );
            self.retry_at = Some(Instant::now() + self.config.reconnect_delay());
        } else if self.attempts >= self.config.max_reconnect_attempts {
            error!("Max reconnection attempts reached");
        }
    }

    fn close_connection(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state.send_replace(state);
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.retry_at = None;
        self.close_connection();
    }
}
