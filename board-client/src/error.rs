use board_core::RealtimeError;
use serde::Deserialize;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum BoardClientError {
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tungstenite::Error>),
    #[error(transparent)]
    Realtime(#[from] RealtimeError),
    #[error("Realtime connection closed")]
    ConnectionClosed,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<tungstenite::Error> for BoardClientError {
    fn from(err: tungstenite::Error) -> Self {
        BoardClientError::WebSocket(Box::new(err))
    }
}

// Both the REST and the storage API answer errors with a `message` field.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl BoardClientError {
    pub async fn from_http_response(resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        Self::from_status_and_body(status, text)
    }

    pub(crate) fn from_status_and_body(status: u16, body: String) -> Self {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        BoardClientError::Http { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_taken_from_json_body() {
        let err = BoardClientError::from_status_and_body(
            400,
            r#"{"code":"23502","details":null,"hint":null,"message":"null value in column \"title\""}"#.into(),
        );
        assert_eq!(err.to_string(), r#"HTTP error 400: null value in column "title""#);
    }

    #[test]
    fn plain_bodies_are_kept() {
        let err = BoardClientError::from_status_and_body(404, "gone".into());
        assert!(matches!(err, BoardClientError::Http { status: 404, .. }));
        assert_eq!(err.to_string(), "HTTP error 404: gone");
    }
}
