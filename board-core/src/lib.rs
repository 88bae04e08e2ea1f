//! Posts board domain shared by the native client and the web page.

pub mod application;
pub mod data;
pub mod domain;
pub mod realtime;

pub use application::board_service::BoardService;
pub use application::post_board::PostBoard;
pub use data::backend::PostsBackend;
pub use domain::change::ChangeEvent;
pub use domain::error::{BoardError, RealtimeError};
pub use domain::post::{ImageFile, NewPost, Post, PostDraft, PostId};
