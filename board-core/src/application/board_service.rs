use chrono::Utc;
use tracing::{error, info, instrument};

use crate::data::backend::PostsBackend;
use crate::data::storage::object_name;
use crate::domain::error::BoardError;
use crate::domain::post::{ImageFile, Post, PostDraft, PostId};

/// Remote side of every board action. Results are handed back to the caller,
/// which applies them to its [`PostBoard`](crate::PostBoard).
#[derive(Clone)]
pub struct BoardService<B: PostsBackend> {
    backend: B,
}

impl<B> BoardService<B>
where
    B: PostsBackend,
{
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[instrument(skip(self))]
    pub async fn load_posts(&self) -> Result<Vec<Post>, BoardError<B::Error>> {
        let posts = self.backend.list_posts().await.map_err(|e| {
            error!(error = %e, "error loading posts");
            BoardError::Backend(e)
        })?;
        info!(count = posts.len(), "posts loaded");
        Ok(posts)
    }

    /// Uploads the attached image, if any, and inserts the row.
    ///
    /// A failed upload is logged and the post is created without an image.
    /// A failed insert after a successful upload leaves the object behind.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_post(&self, draft: PostDraft) -> Result<Post, BoardError<B::Error>> {
        draft.validate::<B::Error>()?;

        let mut draft = draft;
        let image_url = match draft.image.take() {
            Some(image) => self.upload_image(&image).await,
            None => None,
        };
        info!(image = ?image_url, "inserting post");

        let mut rows = self
            .backend
            .insert_post(&draft.into_new_post(image_url))
            .await
            .map_err(|e| {
                error!(error = %e, "error creating post");
                BoardError::Backend(e)
            })?;

        if rows.is_empty() {
            return Err(BoardError::EmptyInsert);
        }
        let post = rows.swap_remove(0);
        info!(post_id = post.id, "post created");
        Ok(post)
    }

    /// Stores the file and resolves its public URL. `None` when the upload fails.
    pub async fn upload_image(&self, image: &ImageFile) -> Option<String> {
        let path = object_name(&image.file_name, Utc::now());
        match self.backend.upload_object(&path, image).await {
            Ok(()) => Some(self.backend.public_url(&path)),
            Err(e) => {
                error!(error = %e, path = %path, "error uploading image");
                None
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, id: PostId) -> Result<(), BoardError<B::Error>> {
        self.backend.delete_post(id).await.map_err(|e| {
            error!(error = %e, "error deleting post");
            BoardError::Backend(e)
        })?;
        info!(post_id = id, "post deleted");
        Ok(())
    }
}
