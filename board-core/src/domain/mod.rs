pub mod change;
pub mod error;
pub mod post;
