pub mod client;
pub mod response;

pub use client::ApiClient;
