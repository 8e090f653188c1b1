//! Session management module

pub mod manager;
pub mod state;
pub mod store;

pub use manager::SessionManager;
pub use state::{Session, StoredCookie};
pub use store::SessionStore;
