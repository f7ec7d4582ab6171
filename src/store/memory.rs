use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::domain::{Post, PostId, PostPatch};
use crate::store::PostStore;

#[derive(Debug, Clone)]
struct Entry {
    post: Post,
    seq: u64,
}

/// In-memory post collection keyed by id.
///
/// Each post carries the arrival sequence number it was inserted with, so the
/// newest-first projection never depends on the display timestamp.
#[derive(Debug, Default)]
pub struct FeedStore {
    entries: HashMap<PostId, Entry>,
    next_seq: u64,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from the initial snapshot.
    pub fn seed(&mut self, posts: Vec<Post>) -> usize {
        self.insert_if_absent(posts)
    }

    /// Arrival sequence number of a post, higher is newer.
    pub fn sequence_of(&self, id: &PostId) -> Option<u64> {
        self.entries.get(id).map(|e| e.seq)
    }
}

impl PostStore for FeedStore {
    /// Batches arrive newest first; the first post of a batch ends up on top.
    /// Within a batch the first copy of an id wins.
    fn insert_if_absent(&mut self, posts: Vec<Post>) -> usize {
        let mut seen = HashSet::new();
        let fresh: Vec<Post> = posts
            .into_iter()
            .filter(|p| !self.entries.contains_key(&p.id) && seen.insert(p.id.clone()))
            .collect();

        let added = fresh.len();
        for post in fresh.into_iter().rev() {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.entries.insert(post.id.clone(), Entry { post, seq });
        }

        added
    }

    fn merge_update(&mut self, patches: Vec<PostPatch>) -> usize {
        let mut merged = 0;

        for mut patch in patches {
            let Some(id) = patch.id.take() else {
                debug!("Dropping update without id");
                continue;
            };

            match self.entries.get_mut(&id) {
                Some(entry) => {
                    entry.post.merge(patch);
                    merged += 1;
                }
                None => debug!("Dropping update for unknown post {}", id),
            }
        }

        merged
    }

    fn get(&self, id: &PostId) -> Option<&Post> {
        self.entries.get(id).map(|e| &e.post)
    }

    fn contains(&self, id: &PostId) -> bool {
        self.entries.contains_key(id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn newest_first(&self) -> Vec<Post> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        entries.into_iter().map(|e| e.post.clone()).collect()
    }
}
