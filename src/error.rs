/* src/error.rs */

use thiserror::Error;

use crate::address::Kind;

/// Result type alias for operations that may fail with `AddrError`.
pub type Result<T> = std::result::Result<T, AddrError>;

/// Errors raised while parsing, matching, or compiling trust.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AddrError {
    /// The text does not follow the address grammar.
    #[error("Invalid address format: {0}")]
    InvalidFormat(String),

    /// Wrong number of IPv4 octets, or an octet above 255.
    #[error("Invalid IPv4 octets: {0}")]
    InvalidOctets(String),

    /// Wrong number of IPv6 groups, or a group above 0xffff.
    #[error("Invalid IPv6 parts: {0}")]
    InvalidParts(String),

    /// A bare numeric IPv4 value does not fit in 32 bits.
    #[error("Address outside defined range: {0}")]
    OutOfRange(String),

    /// A prefix length longer than the address family allows.
    #[error("Invalid prefix length {prefix} (maximum {max})")]
    InvalidPrefixLength { prefix: u32, max: u8 },

    /// Two addresses of different families were compared directly.
    #[error("Cannot match {left} address against {right} address")]
    KindMismatch { left: Kind, right: Kind },

    /// An IPv4 form was asked of an address outside `::ffff:0:0/96`.
    #[error("Address is not an IPv4-mapped IPv6 address: {0}")]
    NotIpv4Mapped(String),

    /// A trust entry whose address part does not parse.
    #[error("Invalid IP address: {0}")]
    InvalidIp(String),

    /// A trust entry whose range suffix is unusable or out of bounds.
    #[error("Invalid range on address: {0}")]
    InvalidRangeOnAddress(String),

    /// A dynamic trust value that is neither a string nor a list of strings.
    #[error("Unsupported trust argument: {0}")]
    UnsupportedTrustArgument(String),

    /// A required argument was empty or null.
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    /// Text with neither address shape.
    #[error("Address is neither IPv4 nor IPv6: {0}")]
    NeitherV4NorV6(String),
}
