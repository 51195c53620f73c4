pub mod expiry;
pub mod state;
pub mod store;
pub mod token;

pub use state::{ClientState, CookieOptions};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use token::{LoginData, TokenManager};
