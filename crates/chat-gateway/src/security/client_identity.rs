use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;

pub const UNKNOWN_CLIENT: &str = "unknown";

/// Whether the HTTP server believes client-supplied forwarding headers.
///
/// Off by default: a caller talking to the listener directly could rotate
/// `x-forwarded-for` on every request and never hit the attempt limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardingPolicy {
    pub trust_forwarded_headers: bool,
}

/// Identity used for rate limiting and request logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

impl ClientIdentity {
    /// Resolve from forwarding headers, falling back to the transport peer.
    ///
    /// Order: first `x-forwarded-for` entry, `client-ip`, `peer`, `unknown`.
    pub fn resolve<'a, F>(header: F, peer: Option<String>) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let forwarded = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let client_ip = header("client-ip").map(str::trim).filter(|v| !v.is_empty());

        let identity = forwarded
            .or(client_ip)
            .map(str::to_string)
            .or(peer.filter(|p| !p.is_empty()))
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

        Self(identity)
    }

    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>, policy: ForwardingPolicy) -> Self {
        let peer = peer.map(|addr| addr.ip().to_string());
        if policy.trust_forwarded_headers {
            Self::resolve(|name| headers.get(name).and_then(|v| v.to_str().ok()), peer)
        } else {
            Self::resolve(|_| None, peer)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for ClientIdentity
where
    ForwardingPolicy: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::from_headers(&parts.headers, peer, ForwardingPolicy::from_ref(state)))
    }
}
