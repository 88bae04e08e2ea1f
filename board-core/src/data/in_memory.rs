//! In-memory backend for tests. Records every call it receives.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use crate::data::backend::PostsBackend;
use crate::data::storage::public_object_url;
use crate::domain::post::{ImageFile, NewPost, Post, PostId};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("in-memory backend refused {0}")]
pub struct InMemoryError(pub &'static str);

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List,
    Insert(NewPost),
    Delete(PostId),
    Upload(String),
}

#[derive(Default)]
struct State {
    rows: Vec<Post>,
    objects: Vec<(String, ImageFile)>,
    calls: Vec<Call>,
    next_id: PostId,
    fail_upload: bool,
    fail_insert: bool,
    fail_delete: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_uploads(&self) {
        self.state.lock().unwrap().fail_upload = true;
    }

    pub fn fail_inserts(&self) {
        self.state.lock().unwrap().fail_insert = true;
    }

    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_delete = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn rows(&self) -> Vec<Post> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn object_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.objects.iter().map(|(name, _)| name.clone()).collect()
    }
}

#[async_trait(?Send)]
impl PostsBackend for InMemoryBackend {
    type Error = InMemoryError;

    async fn list_posts(&self) -> Result<Vec<Post>, Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List);
        Ok(state.rows.clone())
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Vec<Post>, Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Insert(post.clone()));
        if state.fail_insert {
            return Err(InMemoryError("insert"));
        }
        state.next_id += 1;
        let row = Post {
            id: state.next_id,
            title: post.title.clone(),
            description: post.description.clone(),
            image_url: post.image_url.clone(),
            created_at: Utc::now(),
        };
        state.rows.push(row.clone());
        Ok(vec![row])
    }

    async fn delete_post(&self, id: PostId) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(id));
        if state.fail_delete {
            return Err(InMemoryError("delete"));
        }
        state.rows.retain(|p| p.id != id);
        Ok(())
    }

    async fn upload_object(&self, path: &str, file: &ImageFile) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Upload(path.to_string()));
        if state.fail_upload {
            return Err(InMemoryError("upload"));
        }
        state.objects.push((path.to_string(), file.clone()));
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        public_object_url("https://store.test", "attachment", path)
    }
}
