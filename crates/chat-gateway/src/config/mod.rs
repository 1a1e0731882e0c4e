pub mod settings;

pub use settings::{
    AccessConfig, LoggingConfig, ProfileConfig, ProviderConfig, RateLimitConfig, ServerConfig,
    Settings,
};
