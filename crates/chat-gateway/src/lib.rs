//! Access-code gated gateway in front of a single conversational AI backend.

pub mod config;
pub mod handlers;
pub mod models;
pub mod platform;
pub mod providers;
pub mod router;
pub mod security;
pub mod services;
pub mod state;
pub mod utils;

pub use config::Settings;
pub use router::build_router;
pub use state::AppState;
