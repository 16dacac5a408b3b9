pub mod auth;
pub mod comment;
pub mod follow;
pub mod post;
