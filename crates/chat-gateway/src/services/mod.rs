pub mod chat_service;
pub mod profile;
pub mod validate_service;

pub use chat_service::ChatService;
pub use profile::{ProfileError, ProfileLoader};
pub use validate_service::ValidateService;
