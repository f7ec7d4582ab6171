pub mod memory;

use crate::domain::{Post, PostId, PostPatch};

pub use memory::FeedStore;

pub trait PostStore {
    /// Add posts whose id is not yet present. Returns how many were added.
    fn insert_if_absent(&mut self, posts: Vec<Post>) -> usize;

    /// Merge patches onto existing posts. Returns how many posts were touched.
    fn merge_update(&mut self, patches: Vec<PostPatch>) -> usize;

    fn get(&self, id: &PostId) -> Option<&Post>;
    fn contains(&self, id: &PostId) -> bool;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All posts, most recently added first.
    fn newest_first(&self) -> Vec<Post>;
}
