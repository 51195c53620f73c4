pub mod auth;
pub mod enhance;
pub mod job;
pub mod permission;
pub mod video;
