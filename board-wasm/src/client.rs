use crate::config::{POSTS_BUCKET, POSTS_TABLE, SUPABASE_ANON_KEY, SUPABASE_URL};
use crate::error::BoardWasmError;
use async_trait::async_trait;
use board_core::data::storage::{object_url, public_object_url};
use board_core::{ImageFile, NewPost, Post, PostId, PostsBackend};
use gloo_net::http::{Request, RequestBuilder, Response};
use js_sys::Uint8Array;

#[derive(Clone)]
pub struct BoardClientWeb {
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub bucket: String,
}

impl BoardClientWeb {
    pub fn from_build_env() -> Self {
        Self {
            base_url: SUPABASE_URL.trim_end_matches('/').to_string(),
            api_key: SUPABASE_ANON_KEY.to_string(),
            table: POSTS_TABLE.to_string(),
            bucket: POSTS_BUCKET.to_string(),
        }
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", &format!("Bearer {}", self.api_key))
    }

    async fn send(request: Request) -> Result<Response, BoardWasmError> {
        let response = request.send().await?;

        if response.ok() {
            Ok(response)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(BoardWasmError::http(status, text))
        }
    }
}

#[async_trait(?Send)]
impl PostsBackend for BoardClientWeb {
    type Error = BoardWasmError;

    async fn list_posts(&self) -> Result<Vec<Post>, BoardWasmError> {
        let request = self
            .authorized(Request::get(&self.rest_url()))
            .query([("select", "*")])
            .header("Accept", "application/json")
            .build()?;
        let response = Self::send(request).await?;
        Ok(response.json().await?)
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Vec<Post>, BoardWasmError> {
        let request = self
            .authorized(Request::post(&self.rest_url()))
            .header("Prefer", "return=representation")
            .json(&[post])?;
        let response = Self::send(request).await?;
        Ok(response.json().await?)
    }

    async fn delete_post(&self, id: PostId) -> Result<(), BoardWasmError> {
        let filter = format!("eq.{id}");
        let request = self
            .authorized(Request::delete(&self.rest_url()))
            .query([("id", filter.as_str())])
            .build()?;
        Self::send(request).await?;
        Ok(())
    }

    async fn upload_object(&self, path: &str, file: &ImageFile) -> Result<(), BoardWasmError> {
        let body = Uint8Array::from(file.bytes.as_slice());
        let request = self
            .authorized(Request::post(&object_url(&self.base_url, &self.bucket, path)))
            .header("Content-Type", &file.content_type)
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(body)?;
        Self::send(request).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        public_object_url(&self.base_url, &self.bucket, path)
    }
}
