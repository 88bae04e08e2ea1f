// Baked in at build time, e.g. `SUPABASE_URL=... dx serve`.

pub const SUPABASE_URL: &str = match option_env!("SUPABASE_URL") {
    Some(url) => url,
    None => "http://127.0.0.1:54321",
};

pub const SUPABASE_ANON_KEY: &str = match option_env!("SUPABASE_ANON_KEY") {
    Some(key) => key,
    None => "",
};

pub const POSTS_TABLE: &str = match option_env!("POSTS_TABLE") {
    Some(table) => table,
    None => "posts",
};

pub const POSTS_BUCKET: &str = match option_env!("POSTS_BUCKET") {
    Some(bucket) => bucket,
    None => board_core::data::storage::DEFAULT_BUCKET,
};

/// Set `POSTS_REALTIME=off` to build a page without live updates.
pub fn realtime_enabled() -> bool {
    option_env!("POSTS_REALTIME") != Some("off")
}
