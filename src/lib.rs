/* src/lib.rs */
//! # Real Proxy
//!
//! Resolve the originating client address of a request that passed through a
//! chain of proxies, on top of a tolerant IPv4/IPv6 parser and CIDR matcher.
//!
//! ## Features
//!
//! - IPv4 in dotted, single-number, octal and hex notations; IPv6 with `::`
//!   compression and embedded IPv4 tails; `/N` prefixes and netmasks
//! - CIDR matching with IPv4-mapped IPv6 bridging
//! - Reserved-range classification (`loopback`, `private`, `uniqueLocal`, ...)
//! - Trust specs from literals, lists, aliases or custom predicates
//! - Forwarded-chain walking that stops at the first untrusted hop
//! - Optional Axum middleware and extractor via the `axum` feature
//!
//! ## Examples
//!
//! ### Parsing and matching
//!
//! ```rust
//! use real_proxy::{Range, parse_v4};
//!
//! let addr = parse_v4("0xc0a80101", None).unwrap();
//! assert_eq!(addr.to_string(), "192.168.1.1");
//! assert_eq!(addr.range(), Range::Private);
//!
//! let block = parse_v4("192.168.0.0", Some(16)).unwrap();
//! assert!(addr.equals(&block).unwrap());
//! ```
//!
//! ### Resolving the client address
//!
//! ```rust
//! use real_proxy::{RequestInfo, compile_trust, resolve};
//!
//! let trust = compile_trust(["loopback", "10.0.0.0/8"]).unwrap();
//! let req = RequestInfo::new("127.0.0.1", Some("203.0.113.9, 10.0.0.4".to_string()));
//!
//! // Reuse the compiled predicate across requests.
//! assert_eq!(resolve(&req, trust.clone()).unwrap(), "203.0.113.9");
//! ```

pub mod address;
pub mod config;
pub mod error;
pub mod extractor;
pub mod parser;
pub mod range;
pub mod trust;

#[cfg(feature = "axum")]
pub mod middleware;

pub use address::{Address, Kind};
pub use config::ProxyConfig;
pub use error::{AddrError, Result};
pub use extractor::{
    ForwardedRequest, HeaderMap, ProxyResolver, RequestInfo, X_FORWARDED_FOR, all_addresses,
    forwarded_addresses, resolve,
};
pub use parser::{is_v4, is_v6, parse, parse_v4, parse_v6, valid};
pub use range::Range;
pub use trust::{ALIASES, CompiledTrust, TrustSpec, TrustSubnet, compile_subnets, compile_trust};

#[cfg(feature = "axum")]
pub use middleware::{RealIp, RealIpLayer, RealIpService};
