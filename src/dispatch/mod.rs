//! Decoding of data frames into feed deltas.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{Post, PostPatch};
use crate::store::PostStore;
use crate::stream::Frame;

pub const HEARTBEAT_EVENT: &str = "heartbeat";
pub const CONNECTED_EVENT: &str = "connected";

pub const NEW_TRUTHS: &str = "new_truths";
pub const TRUTH_AI_UPDATE: &str = "truth_ai_update";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown delta type: {0}")]
    UnknownType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    NewPosts(Vec<Post>),
    Updates(Vec<PostPatch>),
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    data: Value,
}

/// What a frame did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Inserted(usize),
    Merged(usize),
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct EventDispatcher;

impl EventDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Route one frame to the store. Never fails; bad frames are logged.
    pub fn dispatch<S: PostStore>(&self, frame: &Frame, store: &mut S) -> Dispatch {
        match frame.event.as_str() {
            HEARTBEAT_EVENT => {
                debug!("Stream heartbeat: {}", frame.data);
                return Dispatch::Ignored;
            }
            CONNECTED_EVENT => {
                info!("Stream connected: {}", frame.data);
                return Dispatch::Ignored;
            }
            _ => {}
        }

        match self.decode(frame) {
            Ok(Some(Envelope::NewPosts(posts))) => {
                let added = store.insert_if_absent(posts);
                if added > 0 {
                    info!("Added {} new posts", added);
                }
                Dispatch::Inserted(added)
            }
            Ok(Some(Envelope::Updates(patches))) => {
                let merged = store.merge_update(patches);
                debug!("Merged {} post updates", merged);
                Dispatch::Merged(merged)
            }
            Ok(None) => Dispatch::Ignored,
            Err(DecodeError::UnknownType(kind)) => {
                warn!("Ignoring unknown delta type '{}'", kind);
                Dispatch::Ignored
            }
            Err(e) => {
                warn!("Failed to parse '{}' frame: {}", frame.event, e);
                Dispatch::Ignored
            }
        }
    }

    /// Decode a data frame. `Ok(None)` means there was nothing to apply.
    ///
    /// A payload without `type` takes its type from the frame name.
    pub fn decode(&self, frame: &Frame) -> Result<Option<Envelope>, DecodeError> {
        let raw: RawEnvelope = serde_json::from_str(&frame.data)?;
        let kind = raw.kind.unwrap_or_else(|| frame.event.clone());

        let Value::Array(records) = raw.data else {
            return match kind.as_str() {
                NEW_TRUTHS | TRUTH_AI_UPDATE => Ok(None),
                _ => Err(DecodeError::UnknownType(kind)),
            };
        };

        match kind.as_str() {
            NEW_TRUTHS => {
                let posts = decode_records::<Post>(records, &kind);
                Ok((!posts.is_empty()).then_some(Envelope::NewPosts(posts)))
            }
            TRUTH_AI_UPDATE => {
                let patches = decode_records::<PostPatch>(records, &kind);
                Ok((!patches.is_empty()).then_some(Envelope::Updates(patches)))
            }
            _ => Err(DecodeError::UnknownType(kind)),
        }
    }
}

fn decode_records<T: serde::de::DeserializeOwned>(records: Vec<Value>, kind: &str) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Skipping malformed '{}' record: {}", kind, e);
                None
            }
        })
        .collect()
}
