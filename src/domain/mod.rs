pub mod post;
pub mod segment;
pub mod state;

pub use post::{MediaKind, Post, PostId, PostPatch};
pub use segment::ProcessedSegment;
pub use state::ConnectionState;
