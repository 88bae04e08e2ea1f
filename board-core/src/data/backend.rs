use async_trait::async_trait;

use crate::domain::post::{ImageFile, NewPost, Post, PostId};

/// The hosted data and storage service, seen from a client.
///
/// `?Send` so the same seam serves the browser, where futures are not `Send`.
#[async_trait(?Send)]
pub trait PostsBackend {
    type Error: std::error::Error + 'static;

    async fn list_posts(&self) -> Result<Vec<Post>, Self::Error>;

    /// Inserts one row and returns the stored representations.
    async fn insert_post(&self, post: &NewPost) -> Result<Vec<Post>, Self::Error>;

    async fn delete_post(&self, id: PostId) -> Result<(), Self::Error>;

    async fn upload_object(&self, path: &str, file: &ImageFile) -> Result<(), Self::Error>;

    /// Public URL of an object in the attachment bucket. No request is made.
    fn public_url(&self, path: &str) -> String;
}
