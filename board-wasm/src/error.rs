use board_core::RealtimeError;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoardWasmError {
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },
    #[error(transparent)]
    RequestError(#[from] gloo_net::Error),
    #[error(transparent)]
    Realtime(#[from] RealtimeError),
    #[error("WebSocket error: {0}")]
    WebSocket(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl BoardWasmError {
    pub fn http(status: u16, body: String) -> Self {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        BoardWasmError::Http { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_message_is_extracted() {
        let err = BoardWasmError::http(
            400,
            r#"{"statusCode":"409","error":"Duplicate","message":"The resource already exists"}"#.into(),
        );
        assert_eq!(err.to_string(), "HTTP error 400: The resource already exists");
    }
}
