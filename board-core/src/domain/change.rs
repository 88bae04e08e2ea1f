use derive_more::Display;

use crate::domain::post::{Post, PostId};

/// One row-level notification from the realtime feed.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum ChangeEvent {
    #[display("INSERT {}", _0)]
    Insert(Post),
    #[display("UPDATE {}", _0)]
    Update(Post),
    #[display("DELETE Post {{ id: {} }}", id)]
    Delete { id: PostId },
}
