use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::{FeedError, Result};
use crate::dispatch::{Dispatch, EventDispatcher};
use crate::domain::{ConnectionState, Post};
use crate::store::{FeedStore, PostStore};
use crate::stream::StreamClient;

/// Control messages for the feed task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    Reconnect,
    Shutdown,
}

/// Handle to read and steer a running feed
#[derive(Clone)]
pub struct FeedHandle {
    commands: mpsc::UnboundedSender<Command>,
    posts: watch::Receiver<Arc<Vec<Post>>>,
    state: watch::Receiver<ConnectionState>,
}

impl FeedHandle {
    /// Current posts, newest first
    pub fn posts(&self) -> Arc<Vec<Post>> {
        self.posts.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_posts(&self) -> watch::Receiver<Arc<Vec<Post>>> {
        self.posts.clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn connect(&self) -> Result<()> {
        self.send(Command::Connect)
    }

    pub fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect)
    }

    pub fn reconnect(&self) -> Result<()> {
        self.send(Command::Reconnect)
    }

    /// Ask the feed task to close its connection and exit
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| FeedError::ControllerClosed)
    }
}

/// Owns the stream client and the post store for one session.
///
/// Commands and frames are handled one at a time on a single task, so two
/// deltas never interleave.
pub struct FeedController {
    client: StreamClient,
    store: FeedStore,
    dispatcher: EventDispatcher,
    commands: mpsc::UnboundedReceiver<Command>,
    posts: watch::Sender<Arc<Vec<Post>>>,
}

impl FeedController {
    /// Build a controller seeded with `initial` (newest first).
    pub fn new(client: StreamClient, initial: Vec<Post>) -> (Self, FeedHandle) {
        let mut store = FeedStore::new();
        let seeded = store.seed(initial);
        debug!("Seeded feed with {} posts", seeded);

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (posts, posts_rx) = watch::channel(Arc::new(store.newest_first()));

        let handle = FeedHandle {
            commands: commands_tx,
            posts: posts_rx,
            state: client.subscribe_state(),
        };

        let controller = Self {
            client,
            store,
            dispatcher: EventDispatcher::new(),
            commands,
            posts,
        };

        (controller, handle)
    }

    /// Connect and process commands and frames until shut down.
    pub async fn run(mut self) {
        info!("Feed controller started");
        self.client.connect();

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command.unwrap_or(Command::Shutdown) {
                        Command::Connect => self.client.connect(),
                        Command::Disconnect => self.client.disconnect(),
                        Command::Reconnect => self.client.reconnect(),
                        Command::Shutdown => break,
                    }
                }
                frame = self.client.next_frame() => {
                    let Some(frame) = frame else { break };
                    let outcome = self.dispatcher.dispatch(&frame, &mut self.store);
                    self.apply(outcome);
                }
            }
        }

        self.client.disconnect();
        info!("Feed controller shutting down");
    }

    fn apply(&mut self, outcome: Dispatch) {
        match outcome {
            Dispatch::Inserted(n) | Dispatch::Merged(n) if n > 0 => {
                self.posts.send_replace(Arc::new(self.store.newest_first()));
            }
            _ => {}
        }
    }
}

/// Spawn the feed as a tokio task
pub fn spawn_feed(client: StreamClient, initial: Vec<Post>) -> (FeedHandle, JoinHandle<()>) {
    let (controller, handle) = FeedController::new(client, initial);
    let task = tokio::spawn(controller.run());
    (handle, task)
}
