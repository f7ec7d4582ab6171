//! # truthfeed
//!
//! Client-side synchronization of a live post feed pushed over Server-Sent
//! Events.
//!
//! ## Architecture
//!
//! ```text
//! Transport → StreamClient → EventDispatcher → FeedStore → FeedHandle
//! ```
//!
//! - [`stream`]: connection lifecycle with fixed-delay, bounded reconnects
//! - [`dispatch`]: decodes `new_truths` / `truth_ai_update` envelopes
//! - [`store`]: de-duplicating keyed post collection with newest-first order
//! - [`normalizer`]: turns HTML post bodies into text and link segments
//!
//! ## Quick Start
//!
//! ```bash
//! # Follow the live feed
//! truthfeed --api-url https://api.example.com watch
//!
//! # Normalize one body
//! truthfeed render '<p>See <a href="https://x">here</a></p>'
//! ```

/// Application context, feed controller and error types.
///
/// [`AppContext`](app::AppContext) wires the snapshot fetcher and the stream
/// transport; [`FeedHandle`](app::FeedHandle) is what a UI talks to.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/truthfeed/config.toml`.
pub mod config;

/// Routing of data frames to store operations.
pub mod dispatch;

/// Core domain models.
///
/// - [`Post`](domain::Post) and its partial form [`PostPatch`](domain::PostPatch)
/// - [`ConnectionState`](domain::ConnectionState)
/// - [`ProcessedSegment`](domain::ProcessedSegment)
pub mod domain;

/// Initial snapshot fetch.
pub mod fetcher;

/// Rich-text normalization of post bodies.
pub mod normalizer;

/// In-memory post storage.
pub mod store;

/// Push connection: transport trait, SSE decoding and the lifecycle client.
pub mod stream;
