pub mod context;
pub mod controller;
pub mod error;

pub use context::AppContext;
pub use controller::{spawn_feed, FeedController, FeedHandle};
pub use error::{FeedError, Result};
