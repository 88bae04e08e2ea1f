use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

pub const DEFAULT_BUCKET: &str = "attachment";

// Characters escaped inside one path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Name under which an uploaded file is stored: `<unix millis>_<file name>`.
pub fn object_name(file_name: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}", now.timestamp_millis(), file_name)
}

pub fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// `<base>/storage/v1/object/<bucket>/<path>`, the upload endpoint.
pub fn object_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/storage/v1/object/{}/{}",
        base_url.trim_end_matches('/'),
        bucket,
        encode_object_path(path)
    )
}

pub fn public_object_url(base_url: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/storage/v1/object/public/{}/{}",
        base_url.trim_end_matches('/'),
        bucket,
        encode_object_path(path)
    )
}

/// Best guess at a content type from a file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
