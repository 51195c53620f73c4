pub mod ability;
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod enhance;
pub mod error;
pub mod models;
pub mod permission;
pub mod poller;
pub mod types;
pub mod video;

pub use api::ApiClient;
pub use error::{ClientError, ClientResult};

#[cfg(test)]
pub mod testing;
