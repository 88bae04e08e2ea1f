use tracing::debug;

use crate::domain::change::ChangeEvent;
use crate::domain::post::{Post, PostId};

/// Transient in-memory mirror of the posts table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostBoard {
    posts: Vec<Post>,
    loaded: bool,
}

impl PostBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// True once a full load has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self, id: PostId) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    pub fn replace_all(&mut self, posts: Vec<Post>) {
        self.posts = posts;
        self.loaded = true;
    }

    /// Adds `post`, or replaces the record with the same id if the feed
    /// delivered it first.
    pub fn push(&mut self, post: Post) {
        match self.posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => *existing = post,
            None => self.posts.push(post),
        }
    }

    /// Drops every record with `id`. Returns how many were removed.
    pub fn remove(&mut self, id: PostId) -> usize {
        let before = self.posts.len();
        self.posts.retain(|p| p.id != id);
        before - self.posts.len()
    }

    pub fn apply(&mut self, change: ChangeEvent) {
        debug!(%change, "applying change");
        match change {
            // Our own create may already have put it there.
            ChangeEvent::Insert(post) => self.push(post),
            ChangeEvent::Update(post) => {
                if let Some(existing) = self.posts.iter_mut().find(|p| p.id == post.id) {
                    *existing = post;
                }
            }
            ChangeEvent::Delete { id } => {
                self.remove(id);
            }
        }
    }
}
