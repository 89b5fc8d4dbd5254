/* src/middleware.rs */

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{HeaderMap, StatusCode, request::Parts},
    response::Response,
};
use futures_util::future::BoxFuture;
use std::{
    fmt,
    net::SocketAddr,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::address::Address;
use crate::error::Result;
use crate::extractor::{ProxyResolver, RequestInfo};
use crate::trust::TrustSpec;

/// Extension that holds the resolved client address.
///
/// The text is whatever hop the walk stopped at, which is not always an IP
/// address; use [`RealIp::parsed`] to get one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealIp(pub String);

impl RealIp {
    /// The resolved hop as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resolved hop as an address, if it is one.
    pub fn parsed(&self) -> Option<Address> {
        self.0.parse().ok()
    }
}

impl fmt::Display for RealIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Layer that resolves the client address of every request.
///
/// The connection peer from `ConnectInfo<SocketAddr>` starts the chain, so
/// the app must be served with `into_make_service_with_connect_info`.
///
/// # Examples
///
/// ```rust,no_run
/// use axum::{Router, routing::get};
/// use real_proxy::{RealIp, RealIpLayer};
///
/// async fn handler(real_ip: RealIp) -> String {
///     real_ip.to_string()
/// }
///
/// let app: Router = Router::new()
///     .route("/", get(handler))
///     .layer(RealIpLayer::trusting(["loopback", "uniquelocal"]).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RealIpLayer {
    resolver: ProxyResolver,
}

impl RealIpLayer {
    /// Create a layer that trusts no proxy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a layer around a configured resolver.
    pub fn with_resolver(resolver: ProxyResolver) -> Self {
        Self { resolver }
    }

    /// Create a layer that trusts the given proxies on `x-forwarded-for`.
    pub fn trusting(trust: impl Into<TrustSpec>) -> Result<Self> {
        Ok(Self::with_resolver(ProxyResolver::new().with_trust(trust)?))
    }
}

impl<S> Layer<S> for RealIpLayer {
    type Service = RealIpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RealIpService {
            inner,
            resolver: self.resolver.clone(),
        }
    }
}

/// Service that resolves client addresses.
#[derive(Debug, Clone)]
pub struct RealIpService<S> {
    inner: S,
    resolver: ProxyResolver,
}

impl<S> Service<Request> for RealIpService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|connect_info| connect_info.0.ip().to_string());

        match peer {
            Some(peer) => {
                let info = request_info(req.headers(), peer, self.resolver.header());
                let resolved = self.resolver.resolve_request(&info);
                debug!(
                    peer = %info.peer_addr,
                    forwarded_for = info.forwarded_for.as_deref().unwrap_or(""),
                    real_ip = %resolved,
                    "Resolved client address"
                );
                req.extensions_mut().insert(RealIp(resolved));
            }
            None => warn!("Connection info missing, client address not resolved"),
        }

        let future = self.inner.call(req);
        Box::pin(future)
    }
}

/// Join every value of the chain header, in order, into one list.
fn request_info(headers: &HeaderMap, peer: String, header_name: &str) -> RequestInfo {
    let values: Vec<&str> = headers
        .get_all(header_name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    let forwarded_for = (!values.is_empty()).then(|| values.join(", "));
    RequestInfo::new(peer, forwarded_for)
}

/// Axum extractor for the resolved client address.
///
/// Falls back to the connection peer when the layer is not installed, and
/// rejects with 500 when there is no connection info either.
impl<S> FromRequestParts<S> for RealIp
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        if let Some(real_ip) = parts.extensions.get::<RealIp>() {
            return Ok(real_ip.clone());
        }
        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|connect_info| RealIp(connect_info.0.ip().to_string()))
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "client address unavailable",
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, routing::get};
    use tower::ServiceExt;

    async fn echo(real_ip: RealIp) -> String {
        real_ip.0
    }

    fn request(peer: Option<&str>, forwarded: &[&str]) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        for value in forwarded {
            builder = builder.header("x-forwarded-for", *value);
        }
        let mut req = builder.body(Body::empty()).unwrap();
        if let Some(peer) = peer {
            req.extensions_mut()
                .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        }
        req
    }

    async fn send(app: Router, req: Request) -> (StatusCode, String) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn app(layer: RealIpLayer) -> Router {
        Router::new().route("/", get(echo)).layer(layer)
    }

    #[tokio::test]
    async fn test_resolves_through_trusted_proxy() {
        let layer = RealIpLayer::trusting("loopback").unwrap();
        let req = request(Some("127.0.0.1:4000"), &["203.0.113.7, 127.0.0.2"]);
        let (status, body) = send(app(layer), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_default_layer_uses_peer() {
        let req = request(Some("198.51.100.3:4000"), &["203.0.113.7"]);
        let (_, body) = send(app(RealIpLayer::default()), req).await;
        assert_eq!(body, "198.51.100.3");
    }

    #[tokio::test]
    async fn test_repeated_headers_are_joined() {
        let layer = RealIpLayer::trusting(["loopback", "10.0.0.0/8"]).unwrap();
        let req = request(Some("127.0.0.1:4000"), &["203.0.113.7, 10.0.0.5", "10.0.0.6"]);
        let (_, body) = send(app(layer), req).await;
        assert_eq!(body, "203.0.113.7");
    }

    #[tokio::test]
    async fn test_ipv6_peer() {
        let layer = RealIpLayer::trusting("::1").unwrap();
        let req = request(Some("[::1]:4000"), &["2001:db8::7"]);
        let (_, body) = send(app(layer), req).await;
        assert_eq!(body, "2001:db8::7");
    }

    #[tokio::test]
    async fn test_missing_connect_info_rejects() {
        let req = request(None, &["203.0.113.7"]);
        let (status, _) = send(app(RealIpLayer::default()), req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_parsed() {
        assert!(RealIp("10.0.0.1".to_string()).parsed().is_some());
        assert!(RealIp("proxy.internal".to_string()).parsed().is_none());
    }
}
