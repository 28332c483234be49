pub mod api;
pub mod auth;
pub mod clock;
pub mod commission;
pub mod config;
pub mod db;
pub mod engine;
pub mod entities;
pub mod error;
pub mod estimator;
pub mod events;
pub mod server;
pub mod watcher;
