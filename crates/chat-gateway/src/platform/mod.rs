//! Platform collaborators other than the HTTP server.

pub mod proxy_event;

pub use proxy_event::{handle_chat_event, handle_validate_event, ProxyEvent, ProxyResponse};
