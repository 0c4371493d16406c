pub mod auth;
pub mod broadcasts;
pub mod direct;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod unread;
