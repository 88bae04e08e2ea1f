use crate::config::ClientConfig;
use crate::error::BoardClientError;
use async_trait::async_trait;
use board_core::data::storage::{object_url, public_object_url};
use board_core::{ImageFile, NewPost, Post, PostId, PostsBackend};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use tracing::debug;

/// REST and storage calls against the hosted project.
#[derive(Clone)]
pub struct BoardClientHttp {
    client: Arc<Client>,
    base_url: String,
    table: String,
    bucket: String,
}

impl BoardClientHttp {
    pub fn connect(config: &ClientConfig) -> Result<Self, BoardClientError> {
        let client = Client::builder()
            .default_headers(auth_headers(&config.api_key)?)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.url.trim_end_matches('/').to_string(),
            table: config.table.clone(),
            bucket: config.bucket.clone(),
        })
    }

    fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn list_request(&self) -> RequestBuilder {
        self.client
            .get(self.rest_url())
            .query(&[("select", "*")])
    }

    fn insert_request(&self, post: &NewPost) -> RequestBuilder {
        self.client
            .post(self.rest_url())
            .header("Prefer", "return=representation")
            .json(&[post])
    }

    fn delete_request(&self, id: PostId) -> RequestBuilder {
        self.client
            .delete(self.rest_url())
            .query(&[("id", format!("eq.{id}"))])
    }

    fn upload_request(&self, path: &str, file: &ImageFile) -> RequestBuilder {
        self.client
            .post(object_url(&self.base_url, &self.bucket, path))
            .header(CONTENT_TYPE, file.content_type.as_str())
            .header("cache-control", "max-age=3600")
            .header("x-upsert", "false")
            .body(file.bytes.clone())
    }

    async fn send(req: RequestBuilder) -> Result<Response, BoardClientError> {
        let resp = req.send().await?;
        debug!(status = %resp.status(), url = %resp.url(), "response");

        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(BoardClientError::from_http_response(resp).await)
        }
    }
}

fn auth_headers(api_key: &str) -> Result<HeaderMap, BoardClientError> {
    let invalid = |_| BoardClientError::InvalidRequest("API key is not a valid header value".into());

    let mut headers = HeaderMap::new();
    headers.insert("apikey", HeaderValue::from_str(api_key).map_err(invalid)?);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(invalid)?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}

#[async_trait(?Send)]
impl PostsBackend for BoardClientHttp {
    type Error = BoardClientError;

    async fn list_posts(&self) -> Result<Vec<Post>, BoardClientError> {
        let resp = Self::send(self.list_request()).await?;
        Ok(resp.json().await?)
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Vec<Post>, BoardClientError> {
        let resp = Self::send(self.insert_request(post)).await?;
        Ok(resp.json().await?)
    }

    async fn delete_post(&self, id: PostId) -> Result<(), BoardClientError> {
        Self::send(self.delete_request(id)).await?;
        Ok(())
    }

    async fn upload_object(&self, path: &str, file: &ImageFile) -> Result<(), BoardClientError> {
        Self::send(self.upload_request(path, file)).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        public_object_url(&self.base_url, &self.bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> BoardClientHttp {
        BoardClientHttp::connect(&ClientConfig {
            url: "https://abc.supabase.co".into(),
            api_key: "anon-key".into(),
            table: "posts".into(),
            bucket: "attachment".into(),
        })
        .unwrap()
    }

    #[test]
    fn auth_headers_carry_key_twice() {
        let headers = auth_headers("anon-key").unwrap();
        assert_eq!(headers["apikey"], "anon-key");
        assert_eq!(headers[AUTHORIZATION], "Bearer anon-key");
        assert!(auth_headers("bad\nkey").is_err());
    }

    #[test]
    fn list_selects_all_columns() {
        let req = client().list_request().build().unwrap();
        assert_eq!(req.method(), reqwest::Method::GET);
        assert_eq!(req.url().as_str(), "https://abc.supabase.co/rest/v1/posts?select=*");
    }

    #[test]
    fn insert_asks_for_representation() {
        let post = NewPost {
            title: "Hello".into(),
            description: Some("world".into()),
            image_url: None,
        };
        let req = client().insert_request(&post).build().unwrap();

        assert_eq!(req.method(), reqwest::Method::POST);
        assert_eq!(req.headers()["Prefer"], "return=representation");
        let body: serde_json::Value =
            serde_json::from_slice(req.body().and_then(|b| b.as_bytes()).unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!([{"title": "Hello", "description": "world", "image_url": null}])
        );
    }

    #[test]
    fn delete_filters_by_id() {
        let req = client().delete_request(42).build().unwrap();
        assert_eq!(req.method(), reqwest::Method::DELETE);
        assert_eq!(req.url().as_str(), "https://abc.supabase.co/rest/v1/posts?id=eq.42");
    }

    #[test]
    fn upload_targets_bucket_object() {
        let file = ImageFile {
            file_name: "cat.png".into(),
            content_type: "image/png".into(),
            bytes: vec![1, 2, 3],
        };
        let req = client().upload_request("17_cat.png", &file).build().unwrap();

        assert_eq!(
            req.url().as_str(),
            "https://abc.supabase.co/storage/v1/object/attachment/17_cat.png"
        );
        assert_eq!(req.headers()[CONTENT_TYPE], "image/png");
        assert_eq!(req.body().and_then(|b| b.as_bytes()), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn public_url_needs_no_request() {
        assert_eq!(
            client().public_url("17_cat.png"),
            "https://abc.supabase.co/storage/v1/object/public/attachment/17_cat.png"
        );
    }
}
