pub mod chat;
pub mod validate;

pub use chat::{ChatReply, ChatRequest, ProviderResult, Role, Turn};
pub use validate::{ValidateReply, ValidateRequest};
