pub mod board_service;
pub mod post_board;
