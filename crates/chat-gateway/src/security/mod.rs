pub mod access_gate;
pub mod client_identity;
pub mod rate_limiter;

pub use access_gate::{normalize_code, AccessCodeSet, AccessGate, GateError};
pub use client_identity::{ClientIdentity, ForwardingPolicy};
pub use rate_limiter::{RateLimitEntry, RateLimiter};
