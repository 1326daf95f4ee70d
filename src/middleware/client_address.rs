use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};
use std::net::SocketAddr;

/// Which address a request is attributed to, for throttling and session metadata.
///
/// Forwarding headers are client-controlled, so they only count when a proxy that
/// overwrites them sits in front (`TRUST_PROXY_HEADERS=true`). Otherwise the socket peer
/// recorded by `into_make_service_with_connect_info` is used.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClientAddressPolicy {
    trust_proxy_headers: bool,
}

impl ClientAddressPolicy {
    pub fn new(trust_proxy_headers: bool) -> Self {
        Self { trust_proxy_headers }
    }

    pub fn resolve(&self, headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
        if self.trust_proxy_headers
            && let Some(ip) = forwarded_client_ip(headers)
        {
            return Some(ip);
        }

        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(peer)| peer.ip().to_string())
    }
}

/// Client address from proxy headers, most specific first; the first hop wins in
/// `X-Forwarded-For`
pub fn forwarded_client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded_for) = headers.get("x-forwarded-for")
        && let Ok(forwarded_str) = forwarded_for.to_str()
        && let Some(first_ip) = forwarded_str.split(',').next()
    {
        let ip = first_ip.trim();
        if !ip.is_empty() && ip != "unknown" {
            return Some(ip.to_string());
        }
    }

    ["x-real-ip", "x-client-ip", "cf-connecting-ip"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(str::trim)
        .find(|ip| !ip.is_empty() && *ip != "unknown")
        .map(str::to_string)
}
