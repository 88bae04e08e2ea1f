use thiserror::Error;

/// Failure of a board operation. `E` is the error type of the backend in use.
#[derive(Debug, Error)]
pub enum BoardError<E> {
    #[error("title is required")]
    MissingTitle,
    #[error("insert returned no rows")]
    EmptyInsert,
    #[error("backend error: {0}")]
    Backend(#[source] E),
}

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("malformed realtime frame: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("channel join rejected: {0}")]
    JoinRejected(String),
    #[error("channel error on {topic}")]
    ChannelError { topic: String },
    #[error("channel closed: {topic}")]
    ChannelClosed { topic: String },
    #[error("unexpected change payload: {0}")]
    UnexpectedPayload(String),
}
