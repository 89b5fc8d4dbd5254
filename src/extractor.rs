/* src/extractor.rs */

use std::collections::HashMap;

use crate::error::Result;
use crate::trust::{CompiledTrust, TrustSpec, compile_trust};

/// Type alias for header maps, keyed by lowercase header name.
pub type HeaderMap = HashMap<String, String>;

/// Header read by default for the forwarded chain.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// The two request facts the chain is built from.
///
/// Header-name casing and joining repeated headers are up to the implementor.
pub trait ForwardedRequest {
    /// Address of the transport peer.
    fn peer_addr(&self) -> &str;

    /// Raw forwarded-for header value, if present.
    fn forwarded_for(&self) -> Option<&str>;
}

/// Owned peer address and forwarded-for header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub peer_addr: String,
    pub forwarded_for: Option<String>,
}

impl RequestInfo {
    /// Pair a peer address with an optional raw header value.
    pub fn new(peer_addr: impl Into<String>, forwarded_for: Option<String>) -> Self {
        Self {
            peer_addr: peer_addr.into(),
            forwarded_for,
        }
    }

    /// Read the forwarded-for value from `headers` under `header_name`.
    pub fn from_headers(peer_addr: impl Into<String>, headers: &HeaderMap, header_name: &str) -> Self {
        Self::new(peer_addr, headers.get(&header_name.to_lowercase()).cloned())
    }
}

impl ForwardedRequest for RequestInfo {
    fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    fn forwarded_for(&self) -> Option<&str> {
        self.forwarded_for.as_deref()
    }
}

/// Candidate addresses, nearest hop first.
///
/// The peer address comes first, followed by the header tokens in reverse
/// order, so the original client ends up last. Blank tokens are dropped.
///
/// ```rust
/// use real_proxy::{RequestInfo, forwarded_addresses};
///
/// let req = RequestInfo::new("127.0.0.1", Some("10.0.0.2, 10.0.0.1".to_string()));
/// assert_eq!(forwarded_addresses(&req), ["127.0.0.1", "10.0.0.1", "10.0.0.2"]);
/// ```
pub fn forwarded_addresses<R: ForwardedRequest + ?Sized>(request: &R) -> Vec<String> {
    let mut chain = vec![request.peer_addr().to_string()];
    if let Some(header) = request.forwarded_for() {
        let tokens: Vec<&str> = header
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .collect();
        chain.extend(tokens.into_iter().rev().map(str::to_string));
    }
    chain
}

/// Keep the chain up to and including the first untrusted hop.
fn walk(mut chain: Vec<String>, trust: &CompiledTrust) -> Vec<String> {
    // the last element is the answer whether trusted or not
    let last = chain.len().saturating_sub(1);
    if let Some(untrusted) = (0..last).find(|&i| !trust.is_trusted(&chain[i], i + 1)) {
        chain.truncate(untrusted + 1);
    }
    chain
}

/// The trusted prefix of the chain, ending at the first untrusted hop.
///
/// `None` trusts every hop and returns the whole chain. A raw spec is
/// compiled on every call; pass a [`CompiledTrust`] to avoid that.
pub fn all_addresses<R, T>(request: &R, trust: Option<T>) -> Result<Vec<String>>
where
    R: ForwardedRequest + ?Sized,
    T: Into<TrustSpec>,
{
    let chain = forwarded_addresses(request);
    match trust {
        Some(trust) => Ok(walk(chain, &compile_trust(trust)?)),
        None => Ok(chain),
    }
}

/// Resolve the client address: the first untrusted hop, or the farthest one.
///
/// ```rust
/// use real_proxy::{RequestInfo, resolve};
///
/// let req = RequestInfo::new("10.0.0.1", Some("203.0.113.9, 10.0.0.2".to_string()));
/// assert_eq!(resolve(&req, "10.0.0.0/8").unwrap(), "203.0.113.9");
/// ```
pub fn resolve<R, T>(request: &R, trust: T) -> Result<String>
where
    R: ForwardedRequest + ?Sized,
    T: Into<TrustSpec>,
{
    let trust = compile_trust(trust)?;
    Ok(resolve_compiled(request, &trust))
}

fn resolve_compiled<R: ForwardedRequest + ?Sized>(request: &R, trust: &CompiledTrust) -> String {
    walk(forwarded_addresses(request), trust)
        .pop()
        .unwrap_or_default()
}

/// Reusable resolver: a header name plus a trust predicate compiled once.
#[derive(Debug, Clone)]
pub struct ProxyResolver {
    header: String,
    trust: CompiledTrust,
}

impl Default for ProxyResolver {
    fn default() -> Self {
        Self {
            header: X_FORWARDED_FOR.to_string(),
            trust: CompiledTrust::none(),
        }
    }
}

impl ProxyResolver {
    /// Create a resolver that trusts nobody, so the peer address always wins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header holding the forwarded chain.
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into().to_lowercase();
        self
    }

    /// Compile `trust` and use it for every resolution.
    pub fn with_trust(mut self, trust: impl Into<TrustSpec>) -> Result<Self> {
        self.trust = compile_trust(trust)?;
        Ok(self)
    }

    /// Use an already compiled predicate.
    pub fn with_compiled_trust(mut self, trust: CompiledTrust) -> Self {
        self.trust = trust;
        self
    }

    /// Lowercase name of the chain header.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// The compiled trust predicate.
    pub fn trust(&self) -> &CompiledTrust {
        &self.trust
    }

    /// Resolve the client address for an arbitrary request.
    pub fn resolve_request<R: ForwardedRequest + ?Sized>(&self, request: &R) -> String {
        resolve_compiled(request, &self.trust)
    }

    /// Resolve from a header map and the peer address.
    pub fn resolve(&self, headers: &HeaderMap, peer_addr: &str) -> String {
        self.resolve_request(&RequestInfo::from_headers(peer_addr, headers, &self.header))
    }

    /// Trusted prefix of the chain built from a header map and the peer address.
    pub fn all_addresses(&self, headers: &HeaderMap, peer_addr: &str) -> Vec<String> {
        let request = RequestInfo::from_headers(peer_addr, headers, &self.header);
        walk(forwarded_addresses(&request), &self.trust)
    }
}
