use board_core::data::storage::DEFAULT_BUCKET;

pub const DEFAULT_TABLE: &str = "posts";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub api_key: String,
    pub table: String,
    pub bucket: String,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::load(None, None)
    }

    /// Reads `.env` and the environment. Explicit values win over both.
    pub fn load(url: Option<String>, api_key: Option<String>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| match name {
            "SUPABASE_URL" if url.is_some() => url.clone(),
            "SUPABASE_ANON_KEY" if api_key.is_some() => api_key.clone(),
            _ => std::env::var(name).ok(),
        })
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str, fallback: &str| {
            lookup(name)
                .or_else(|| lookup(fallback))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let url = var("SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("SUPABASE_URL must be set"))?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("invalid SUPABASE_URL: {}", url);
        }
        let api_key = var("SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY")
            .ok_or_else(|| anyhow::anyhow!("SUPABASE_ANON_KEY must be set"))?;
        let table = lookup("POSTS_TABLE").unwrap_or_else(|| DEFAULT_TABLE.into());
        let bucket = lookup("POSTS_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.into());

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            api_key,
            table,
            bucket,
        })
    }
}
