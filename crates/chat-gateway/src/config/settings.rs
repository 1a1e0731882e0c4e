use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_PROVIDER: &str = "anthropic";

/// How a deployment variable's value must parse before it is applied.
#[derive(Debug, Clone, Copy)]
enum VarKind {
    Text,
    /// Unsigned integer no larger than the bound.
    Number(u64),
    Flag,
}

/// Flat deployment variables and the setting each one overrides.
const DEPLOYMENT_VARS: &[(&str, &str, VarKind)] = &[
    ("ACCESS_CODES", "access.codes", VarKind::Text),
    ("AI_PROVIDER", "provider.name", VarKind::Text),
    ("AI_API_KEY", "provider.api_key", VarKind::Text),
    ("ANTHROPIC_API_KEY", "provider.anthropic_api_key", VarKind::Text),
    ("GOOGLE_API_KEY", "provider.google_api_key", VarKind::Text),
    ("AI_MODEL", "provider.model", VarKind::Text),
    ("AI_API_ENDPOINT", "provider.endpoint", VarKind::Text),
    ("AI_API_VERSION", "provider.api_version", VarKind::Text),
    ("AI_MAX_TOKENS", "provider.max_tokens", VarKind::Number(u32::MAX as u64)),
    ("AI_TIMEOUT_SECONDS", "provider.timeout_seconds", VarKind::Number(u64::MAX)),
    ("PROFILE_PROMPT", "profile.prompt", VarKind::Text),
    ("PROFILE_PATH", "profile.path", VarKind::Text),
    ("MESSAGE_LEVEL", "logging.message_level", VarKind::Text),
    ("HOST", "server.host", VarKind::Text),
    ("PORT", "server.port", VarKind::Number(u16::MAX as u64)),
    ("TRUST_FORWARDED_HEADERS", "server.trust_forwarded_headers", VarKind::Flag),
    ("RATE_LIMIT_MAX_ATTEMPTS", "rate_limit.max_attempts", VarKind::Number(u32::MAX as u64)),
    ("RATE_LIMIT_WINDOW_SECONDS", "rate_limit.window_seconds", VarKind::Number(u64::MAX)),
];

impl VarKind {
    fn accepts(self, value: &str) -> bool {
        match self {
            VarKind::Text => true,
            VarKind::Number(max) => value.parse::<u64>().is_ok_and(|n| n <= max),
            VarKind::Flag => matches!(
                value.to_ascii_lowercase().as_str(),
                "true" | "false" | "1" | "0" | "yes" | "no" | "on" | "off"
            ),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub access: AccessConfig,
    pub provider: ProviderConfig,
    pub profile: ProfileConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
    /// Key clients by `x-forwarded-for` / `client-ip`. Only enable behind a
    /// proxy that overwrites those headers.
    pub trust_forwarded_headers: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AccessConfig {
    /// Comma-separated allow-list of access codes.
    pub codes: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    pub api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub api_version: Option<String>,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProfileConfig {
    pub prompt: Option<String>,
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window_seconds: u64,
    pub cleanup_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `VERBOSE` exposes upstream error messages to clients.
    pub message_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            body_limit_bytes: 1024 * 1024,
            trust_forwarded_headers: false,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER.to_string(),
            api_key: None,
            anthropic_api_key: None,
            google_api_key: None,
            model: None,
            endpoint: None,
            api_version: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_seconds: 60,
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            prompt: None,
            path: "profile.md".to_string(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            window_seconds: 15 * 60,
            cleanup_interval_seconds: 5 * 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            message_level: "INFORMATION".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from defaults, `config/settings.*`, `APP__*` variables
    /// and the flat deployment variables, in that order of precedence.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same layering as [`Settings::load`], with deployment variables read
    /// through `lookup` instead of the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();

        let mut builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("server.body_limit_bytes", defaults.server.body_limit_bytes as i64)?
            .set_default("server.trust_forwarded_headers", defaults.server.trust_forwarded_headers)?
            .set_default("provider.name", defaults.provider.name)?
            .set_default("provider.max_tokens", i64::from(defaults.provider.max_tokens))?
            .set_default("provider.timeout_seconds", defaults.provider.timeout_seconds as i64)?
            .set_default("profile.path", defaults.profile.path)?
            .set_default("rate_limit.max_attempts", i64::from(defaults.rate_limit.max_attempts))?
            .set_default("rate_limit.window_seconds", defaults.rate_limit.window_seconds as i64)?
            .set_default(
                "rate_limit.cleanup_interval_seconds",
                defaults.rate_limit.cleanup_interval_seconds as i64,
            )?
            .set_default("logging.message_level", defaults.logging.message_level)?
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key, kind) in DEPLOYMENT_VARS {
            let value = lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .filter(|v| {
                    let ok = kind.accepts(v);
                    if !ok {
                        warn!(var = *var, value = %v, "ignoring malformed value; falling back to default");
                    }
                    ok
                });
            builder = builder.set_override_option(*key, value)?;
        }

        builder.build()?.try_deserialize()
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl LoggingConfig {
    pub fn verbose_errors(&self) -> bool {
        self.message_level.trim().eq_ignore_ascii_case("VERBOSE")
    }
}
