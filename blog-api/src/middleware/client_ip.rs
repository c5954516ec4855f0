use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::AppState;

/// Address the rate limiters key on.
///
/// Every proxy appends the address it received the request from to
/// `X-Forwarded-For`, so only the right-most `trusted_hops` entries were
/// written by infrastructure we run. Anything further left came from the
/// client and is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>, trusted_hops: usize) -> Self {
        let forwarded: Vec<&str> = headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .collect();

        let mut client = peer.map(|addr| addr.ip());
        for hop in forwarded.iter().rev().take(trusted_hops) {
            match hop.parse::<IpAddr>() {
                Ok(ip) => client = Some(ip),
                // a garbage hop ends the chain we can vouch for
                Err(_) => break,
            }
        }

        match client {
            Some(ip) => Self(ip.to_string()),
            None => Self("unknown".to_string()),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self::resolve(&parts.headers, peer, state.config.trusted_proxy_hops))
    }
}
