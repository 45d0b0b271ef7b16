pub mod app;
pub mod autoplay;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http_backend;
pub mod mode;
pub mod model;
pub mod player;
pub mod playlists;
pub mod providers;
pub mod queue;
pub mod repository;
pub mod server_store;
pub mod shell;
