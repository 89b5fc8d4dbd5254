/* src/trust.rs */

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::address::{Address, Kind};
use crate::error::{AddrError, Result};
use crate::parser::{self, is_decimal};

/// Named trust lists accepted anywhere a literal is.
pub const ALIASES: &[(&str, &[&str])] = &[
    ("linklocal", &["169.254.0.0/16", "fe80::/10"]),
    ("loopback", &["127.0.0.1/8", "::1/128"]),
    (
        "uniquelocal",
        &["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16", "fc00::/7"],
    ),
];

fn alias(name: &str) -> Option<&'static [&'static str]> {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|&(_, entries)| entries)
}

/// One parsed trust entry: an address bound to the prefix length to match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrustSubnet {
    address: Address,
}

impl TrustSubnet {
    /// Parse `address`, `address/len` or `address/netmask`.
    ///
    /// IPv4-mapped entries are stored in IPv4 form with the prefix reduced by 96.
    pub fn parse(note: &str) -> Result<Self> {
        let (text, range) = match note.rsplit_once('/') {
            Some((text, range)) => (text, Some(range)),
            None => (note, None),
        };

        // at most one suffix per entry
        if text.contains('/') {
            return Err(AddrError::InvalidIp(text.to_string()));
        }
        let address = parser::parse(text)
            .map_err(|_| AddrError::InvalidIp(text.to_string()))?;
        let max = address.kind().max_prefix_len();
        let invalid_range = || AddrError::InvalidRangeOnAddress(note.to_string());

        let prefix = match range {
            None => u32::from(max),
            Some(digits) if is_decimal(digits) => digits.parse::<u32>().unwrap_or(u32::MAX),
            Some(mask) if parser::is_v4(mask, false) || parser::is_v6(mask, false) => {
                let mask = parser::parse(mask).map_err(|_| invalid_range())?;
                if mask.kind() != address.kind() {
                    return Err(invalid_range());
                }
                u32::from(mask.netmask_prefix_len())
            }
            Some(_) => return Err(invalid_range()),
        };
        if prefix == 0 || prefix > u32::from(max) {
            return Err(invalid_range());
        }
        let mut prefix = prefix as u8;

        let address = if address.is_ipv4_mapped() {
            prefix = prefix.saturating_sub(96);
            address.to_ipv4()?
        } else {
            address
        };

        Ok(Self {
            address: address.with_cidr(prefix)?,
        })
    }

    /// Network address, bound to [`TrustSubnet::prefix_len`].
    pub fn address(&self) -> Address {
        self.address
    }

    /// Number of leading bits a candidate must share.
    pub fn prefix_len(&self) -> u8 {
        self.address.prefix_len()
    }

    /// Family a candidate is compared in.
    pub fn kind(&self) -> Kind {
        self.address.kind()
    }

    /// Whether `candidate` lies in this subnet.
    ///
    /// An IPv4-mapped candidate is compared against an IPv4 subnet through
    /// its IPv4 form. IPv4 candidates never match IPv6 subnets.
    pub fn contains(&self, candidate: &Address) -> bool {
        match (candidate.kind(), self.kind()) {
            (Kind::V6, Kind::V4) => candidate
                .to_ipv4()
                .is_ok_and(|v4| self.contains_same_kind(&v4)),
            _ => self.contains_same_kind(candidate),
        }
    }

    fn contains_same_kind(&self, candidate: &Address) -> bool {
        candidate.match_bits(&self.address, self.prefix_len())
    }
}

impl FromStr for TrustSubnet {
    type Err = AddrError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TrustSubnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len())
    }
}

type TrustFn = dyn Fn(&str, usize) -> bool + Send + Sync;

/// A compiled trust predicate over `(address text, 1-based chain index)`.
///
/// Cloning shares the underlying closure.
#[derive(Clone)]
pub struct CompiledTrust(Arc<TrustFn>);

impl CompiledTrust {
    /// Wrap a custom predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&str, usize) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Trust nobody.
    pub fn none() -> Self {
        Self::new(|_, _| false)
    }

    /// Trust every hop.
    pub fn all() -> Self {
        Self::new(|_, _| true)
    }

    /// Whether the hop `addr` at 1-based chain position `index` is trusted.
    pub fn is_trusted(&self, addr: &str, index: usize) -> bool {
        (self.0)(addr, index)
    }
}

impl fmt::Debug for CompiledTrust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTrust").finish_non_exhaustive()
    }
}

/// What to trust: literals, aliases, or a ready predicate.
#[derive(Debug, Clone)]
pub enum TrustSpec {
    /// One address, subnet, or alias name.
    Literal(String),
    /// Any mix of addresses, subnets, and alias names.
    List(Vec<String>),
    /// Used as-is, no compilation.
    Predicate(CompiledTrust),
}

impl TrustSpec {
    /// Wrap a custom predicate as a spec.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str, usize) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(CompiledTrust::new(predicate))
    }
}

impl Default for TrustSpec {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl From<&str> for TrustSpec {
    fn from(literal: &str) -> Self {
        Self::Literal(literal.to_string())
    }
}

impl From<String> for TrustSpec {
    fn from(literal: String) -> Self {
        Self::Literal(literal)
    }
}

impl From<Vec<String>> for TrustSpec {
    fn from(list: Vec<String>) -> Self {
        Self::List(list)
    }
}

impl From<Vec<&str>> for TrustSpec {
    fn from(list: Vec<&str>) -> Self {
        list.as_slice().into()
    }
}

impl From<&[&str]> for TrustSpec {
    fn from(list: &[&str]) -> Self {
        Self::List(list.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TrustSpec {
    fn from(list: [&str; N]) -> Self {
        list.as_slice().into()
    }
}

impl From<CompiledTrust> for TrustSpec {
    fn from(trust: CompiledTrust) -> Self {
        Self::Predicate(trust)
    }
}

impl TryFrom<Value> for TrustSpec {
    type Error = AddrError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(AddrError::MissingArgument("trust")),
            Value::String(literal) => Ok(Self::Literal(literal)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(literal) => Ok(literal),
                    other => Err(AddrError::UnsupportedTrustArgument(other.to_string())),
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::List),
            other => Err(AddrError::UnsupportedTrustArgument(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for TrustSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// Compile a trust spec into a predicate.
///
/// Predicates pass through unchanged. Literals and lists are expanded one
/// alias level deep, parsed into subnets, and compiled by subnet count.
pub fn compile_trust(spec: impl Into<TrustSpec>) -> Result<CompiledTrust> {
    let entries = match spec.into() {
        TrustSpec::Predicate(trust) => return Ok(trust),
        TrustSpec::Literal(literal) if literal.is_empty() => {
            return Err(AddrError::MissingArgument("trust"));
        }
        TrustSpec::Literal(literal) => vec![literal],
        TrustSpec::List(list) => list,
    };

    let mut notes: Vec<&str> = Vec::with_capacity(entries.len());
    for entry in &entries {
        match alias(entry) {
            Some(expanded) => notes.extend_from_slice(expanded),
            None => notes.push(entry),
        }
    }

    let subnets = notes
        .into_iter()
        .map(TrustSubnet::parse)
        .collect::<Result<Vec<_>>>()?;
    Ok(compile_subnets(subnets))
}

/// Build the predicate for already-parsed subnets.
pub fn compile_subnets(subnets: Vec<TrustSubnet>) -> CompiledTrust {
    match subnets.len() {
        0 => CompiledTrust::none(),
        1 => trust_single(subnets[0]),
        _ => trust_multi(subnets),
    }
}

fn trust_single(subnet: TrustSubnet) -> CompiledTrust {
    CompiledTrust::new(move |addr, _| {
        parser::parse(addr).is_ok_and(|candidate| subnet.contains(&candidate))
    })
}

fn trust_multi(subnets: Vec<TrustSubnet>) -> CompiledTrust {
    CompiledTrust::new(move |addr, _| {
        let Ok(candidate) = parser::parse(addr) else {
            return false;
        };
        // converted once, reused for every IPv4 subnet
        let as_v4 = candidate.to_ipv4().ok();
        subnets.iter().any(|subnet| {
            if subnet.kind() == candidate.kind() {
                subnet.contains_same_kind(&candidate)
            } else if subnet.kind() == Kind::V4 {
                as_v4.is_some_and(|v4| subnet.contains_same_kind(&v4))
            } else {
                false
            }
        })
    })
}
