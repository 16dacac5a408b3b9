pub mod dto;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod render;
pub mod routes;
pub mod urls;
pub mod utils;
