use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::domain::error::BoardError;

/// Identity assigned by the store.
pub type PostId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Display)]
#[display("Post {{ id: {}, title: {} }}", id, title)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// Row body for an insert. Identity and timestamp are filled in by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What the create form collects before anything is sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub description: Option<String>,
    pub image: Option<ImageFile>,
}

impl PostDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image(mut self, image: ImageFile) -> Self {
        self.image = Some(image);
        self
    }

    pub fn validate<E>(&self) -> Result<(), BoardError<E>> {
        if self.title.trim().is_empty() {
            return Err(BoardError::MissingTitle);
        }
        Ok(())
    }

    pub fn into_new_post(self, image_url: Option<String>) -> NewPost {
        NewPost {
            title: self.title,
            description: self.description,
            image_url,
        }
    }
}

/// Store timestamps arrive as RFC 3339 from the REST API and in Postgres text
/// form (`2024-05-01 12:00:00.5+00`) from the realtime feed.
pub mod timestamp {
    use chrono::{DateTime, ParseError, Utc};
    use serde::{Deserialize, Deserializer};

    const POSTGRES_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, ParseError> {
        let mut result = DateTime::parse_from_rfc3339(raw);
        for format in POSTGRES_FORMATS {
            if result.is_ok() {
                break;
            }
            result = DateTime::parse_from_str(raw, format);
        }
        result.map(|dt| dt.with_timezone(&Utc))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}
