/* src/parser.rs */

//! Text to [`Address`] conversion.
//!
//! IPv4 accepts a dotted quad or a single 32-bit number, and every numeric
//! token may be decimal, `0`-prefixed octal, or `0x`-prefixed hex. IPv6
//! accepts colon-separated hex groups with at most one `::` and an optional
//! embedded dotted-quad tail. Both accept a trailing `/N` prefix length.
//!
//! The shape checks (`is_v4`, `is_v6`) only look at structure; a shaped
//! string can still fail the full parse, e.g. `1024.0.0.1`.

use std::str::FromStr;

use crate::address::{Address, Kind};
use crate::error::{AddrError, Result};

/// Parse an IPv4 address, optionally with a `/N` suffix.
///
/// `cidr` is used when the text carries no suffix; otherwise the prefix is 32.
pub fn parse_v4(text: &str, cidr: Option<u8>) -> Result<Address> {
    let (addr, suffix) = split_cidr(text);
    let tokens = v4_tokens(addr)
        .ok_or_else(|| AddrError::InvalidFormat(format!("'{text}' is not an IPv4 address")))?;

    let octets = match tokens.as_slice() {
        [single] => {
            let value = parse_numeric(single)?;
            u32::try_from(value)
                .map_err(|_| AddrError::OutOfRange(text.to_string()))?
                .to_be_bytes()
        }
        quad => quad_octets(quad, text)?,
    };

    let prefix = resolve_cidr(suffix, cidr, Kind::V4, text)?;
    Address::v4(octets, Some(prefix))
}

/// Parse an IPv6 address, optionally with a `/N` suffix.
///
/// `cidr` is used when the text carries no suffix; otherwise the prefix is 128.
pub fn parse_v6(text: &str, cidr: Option<u8>) -> Result<Address> {
    let (addr, suffix) = split_cidr(text);
    let layout = v6_layout(addr)?;
    let parts = expand_v6(&layout, text)?;
    let prefix = resolve_cidr(suffix, cidr, Kind::V6, text)?;
    Address::v6(parts, Some(prefix))
}

/// Parse either family, trying the IPv6 shape first.
pub fn parse(text: &str) -> Result<Address> {
    if is_v6(text, false) {
        parse_v6(text, None)
    } else if is_v4(text, false) {
        parse_v4(text, None)
    } else {
        Err(AddrError::NeitherV4NorV6(text.to_string()))
    }
}

/// Whether `text` has the shape of an IPv4 address.
///
/// With `validate` set, the full parse must also succeed.
pub fn is_v4(text: &str, validate: bool) -> bool {
    let (addr, suffix) = split_cidr(text);
    let shaped = suffix.is_none_or(is_decimal) && v4_tokens(addr).is_some();
    shaped && (!validate || parse_v4(text, None).is_ok())
}

/// Whether `text` has the shape of an IPv6 address.
///
/// With `validate` set, the full parse must also succeed.
pub fn is_v6(text: &str, validate: bool) -> bool {
    let (addr, suffix) = split_cidr(text);
    let shaped = suffix.is_none_or(is_decimal) && v6_layout(addr).is_ok();
    shaped && (!validate || parse_v6(text, None).is_ok())
}

/// Whether [`parse`] would succeed. Never fails.
pub fn valid(text: &str) -> bool {
    parse(text).is_ok()
}

impl FromStr for Address {
    type Err = AddrError;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

fn split_cidr(text: &str) -> (&str, Option<&str>) {
    match text.rsplit_once('/') {
        Some((addr, suffix)) => (addr, Some(suffix)),
        None => (text, None),
    }
}

/// Explicit suffix first, then the caller's default, then the family maximum.
fn resolve_cidr(suffix: Option<&str>, default: Option<u8>, kind: Kind, text: &str) -> Result<u8> {
    let max = kind.max_prefix_len();
    let prefix = match (suffix, default) {
        (Some(digits), _) => {
            if !is_decimal(digits) {
                return Err(AddrError::InvalidFormat(format!(
                    "invalid prefix length in '{text}'"
                )));
            }
            // only overflow can fail here
            digits.parse::<u32>().unwrap_or(u32::MAX)
        }
        (None, Some(prefix)) => u32::from(prefix),
        (None, None) => return Ok(max),
    };
    if prefix > u32::from(max) {
        return Err(AddrError::InvalidPrefixLength { prefix, max });
    }
    Ok(prefix as u8)
}

pub(crate) fn is_decimal(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

fn strip_hex_prefix(token: &str) -> Option<&str> {
    token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
}

fn is_numeric_token(token: &str) -> bool {
    match strip_hex_prefix(token) {
        Some(hex) => !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()),
        None => is_decimal(token),
    }
}

/// Numeric tokens of an IPv4 literal, when it is one token or a quad.
fn v4_tokens(addr: &str) -> Option<Vec<&str>> {
    let tokens: Vec<&str> = addr.split('.').collect();
    let arity_ok = tokens.len() == 1 || tokens.len() == 4;
    (arity_ok && tokens.iter().all(|t| is_numeric_token(t))).then_some(tokens)
}

/// Read a decimal, `0`-prefixed octal, or `0x` hex token. Saturates at `u64::MAX`.
fn parse_numeric(token: &str) -> Result<u64> {
    let (digits, radix) = match strip_hex_prefix(token) {
        Some(hex) => (hex, 16),
        None if token.len() > 1 && token.starts_with('0') => (&token[1..], 8),
        None => (token, 10),
    };
    digits.chars().try_fold(0u64, |acc, c| {
        let digit = c.to_digit(radix).ok_or_else(|| {
            AddrError::InvalidFormat(format!("invalid digit '{c}' in '{token}'"))
        })?;
        Ok(acc
            .saturating_mul(u64::from(radix))
            .saturating_add(u64::from(digit)))
    })
}

fn quad_octets(tokens: &[&str], text: &str) -> Result<[u8; 4]> {
    if tokens.len() != 4 {
        return Err(AddrError::InvalidOctets(format!(
            "expected 4 octets in '{text}', found {}",
            tokens.len()
        )));
    }
    let mut octets = [0u8; 4];
    for (octet, token) in octets.iter_mut().zip(tokens) {
        *octet = u8::try_from(parse_numeric(token)?).map_err(|_| {
            AddrError::InvalidOctets(format!("octet '{token}' in '{text}' does not fit in 8 bits"))
        })?;
    }
    Ok(octets)
}

/// Groups of an IPv6 literal before zero padding.
#[derive(Debug, PartialEq)]
struct V6Layout<'a> {
    /// Groups before `::`, or all groups when there is none.
    head: Vec<&'a str>,
    /// Groups after `::`; `None` when the literal is not compressed.
    tail: Option<Vec<&'a str>>,
    /// Trailing dotted quad.
    embedded: Option<&'a str>,
}

fn v6_layout(addr: &str) -> Result<V6Layout<'_>> {
    let malformed = || AddrError::InvalidFormat(format!("'{addr}' is not an IPv6 address"));
    if !addr.contains(':') {
        return Err(malformed());
    }

    let mut halves = addr.split("::");
    let head_text = halves.next().unwrap_or_default();
    let tail_text = halves.next();
    if halves.next().is_some() {
        return Err(AddrError::InvalidFormat(format!(
            "'{addr}' contains more than one '::'"
        )));
    }

    let mut head = split_groups(head_text).ok_or_else(malformed)?;
    let mut tail = match tail_text {
        Some(text) => Some(split_groups(text).ok_or_else(malformed)?),
        None => None,
    };

    let last_side = tail.as_mut().unwrap_or(&mut head);
    let has_embedded = last_side.last().is_some_and(|group| group.contains('.'));
    let embedded = if has_embedded { last_side.pop() } else { None };

    let groups_ok = head
        .iter()
        .chain(tail.iter().flatten())
        .all(|g| g.bytes().all(|b| b.is_ascii_hexdigit()));
    let embedded_ok = embedded.is_none_or(|quad| {
        let tokens: Vec<&str> = quad.split('.').collect();
        tokens.len() == 4 && tokens.iter().all(|t| is_decimal(t))
    });
    if !groups_ok || !embedded_ok {
        return Err(malformed());
    }

    Ok(V6Layout {
        head,
        tail,
        embedded,
    })
}

/// Colon-separated groups; `None` if any group is empty.
fn split_groups(text: &str) -> Option<Vec<&str>> {
    if text.is_empty() {
        return Some(Vec::new());
    }
    let groups: Vec<&str> = text.split(':').collect();
    groups.iter().all(|g| !g.is_empty()).then_some(groups)
}

fn expand_v6(layout: &V6Layout<'_>, text: &str) -> Result<[u16; 8]> {
    let required = if layout.embedded.is_some() { 6 } else { 8 };
    let explicit = layout.head.len() + layout.tail.as_ref().map_or(0, Vec::len);
    let padding = match layout.tail {
        Some(_) if explicit <= required => required - explicit,
        None if explicit == required => 0,
        _ => {
            return Err(AddrError::InvalidParts(format!(
                "expected {required} groups in '{text}', found {explicit}"
            )));
        }
    };

    let mut parts = Vec::with_capacity(8);
    for group in &layout.head {
        parts.push(parse_group(group, text)?);
    }
    parts.extend(std::iter::repeat_n(0u16, padding));
    for group in layout.tail.iter().flatten() {
        parts.push(parse_group(group, text)?);
    }
    if let Some(quad) = layout.embedded {
        let [a, b, c, d] = embedded_octets(quad, text)?;
        parts.push(u16::from_be_bytes([a, b]));
        parts.push(u16::from_be_bytes([c, d]));
    }

    parts.try_into().map_err(|parts: Vec<u16>| {
        AddrError::InvalidParts(format!("expected 8 groups in '{text}', found {}", parts.len()))
    })
}

fn parse_group(group: &str, text: &str) -> Result<u16> {
    if group.len() > 4 {
        return Err(AddrError::InvalidParts(format!(
            "group '{group}' in '{text}' does not fit in 16 bits"
        )));
    }
    u16::from_str_radix(group, 16)
        .map_err(|_| AddrError::InvalidFormat(format!("invalid group '{group}' in '{text}'")))
}

fn embedded_octets(quad: &str, text: &str) -> Result<[u8; 4]> {
    let mut octets = [0u8; 4];
    for (octet, token) in octets.iter_mut().zip(quad.split('.')) {
        *octet = token.parse().map_err(|_| {
            AddrError::InvalidOctets(format!(
                "embedded octet '{token}' in '{text}' does not fit in 8 bits"
            ))
        })?;
    }
    Ok(octets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_numeric_forms_are_equivalent() {
        let dotted = parse_v4("192.168.1.1", None).unwrap();
        assert_eq!(parse_v4("0xc0a80101", None).unwrap(), dotted);
        assert_eq!(parse_v4("0XC0A80101", None).unwrap(), dotted);
        assert_eq!(parse_v4("3232235777", None).unwrap(), dotted);
        assert_eq!(parse_v4("030052000401", None).unwrap(), dotted);
    }

    #[test]
    fn test_octal_and_hex_octets() {
        let addr = parse_v4("192.0250.1.1", None).unwrap();
        assert_eq!(addr.octets(), Some([192, 168, 1, 1]));
        let addr = parse_v4("0x7f.0.0.01", None).unwrap();
        assert_eq!(addr.octets(), Some([127, 0, 0, 1]));
        assert_eq!(parse_v4("0.0.0.0", None).unwrap().octets(), Some([0; 4]));
    }

    #[test]
    fn test_invalid_octal_digit() {
        assert!(matches!(parse_v4("1.2.3.08", None), Err(AddrError::InvalidFormat(_))));
    }

    #[test]
    fn test_two_and_three_part_forms_rejected() {
        assert!(matches!(parse_v4("127.1", None), Err(AddrError::InvalidFormat(_))));
        assert!(matches!(parse_v4("10.0.1", None), Err(AddrError::InvalidFormat(_))));
        assert!(!is_v4("127.1", false));
    }

    #[test]
    fn test_octet_out_of_range() {
        assert!(matches!(parse_v4("1024.0.0.1", None), Err(AddrError::InvalidOctets(_))));
        assert!(matches!(parse_v4("1.2.3.0x100", None), Err(AddrError::InvalidOctets(_))));
    }

    #[test]
    fn test_single_value_overflow() {
        assert!(matches!(parse_v4("4294967296", None), Err(AddrError::OutOfRange(_))));
        assert!(matches!(parse_v4("0x100000000", None), Err(AddrError::OutOfRange(_))));
        assert!(parse_v4("4294967295", None).is_ok());
    }

    #[test]
    fn test_v4_prefix_sources() {
        assert_eq!(parse_v4("10.0.0.0", None).unwrap().prefix_len(), 32);
        assert_eq!(parse_v4("10.0.0.0", Some(8)).unwrap().prefix_len(), 8);
        assert_eq!(parse_v4("10.0.0.0/16", Some(8)).unwrap().prefix_len(), 16);
        assert_eq!(
            parse_v4("10.0.0.0/33", None),
            Err(AddrError::InvalidPrefixLength { prefix: 33, max: 32 })
        );
        assert!(matches!(parse_v4("10.0.0.0/x", None), Err(AddrError::InvalidFormat(_))));
    }

    #[test]
    fn test_shape_versus_strict() {
        assert!(is_v4("1024.0.0.1", false));
        assert!(!is_v4("1024.0.0.1", true));
        assert!(!is_v4("8.0xa.wtf.6", false));
        assert!(is_v4("10.0.0.1/8", true));
        assert!(!is_v4("", false));
        assert!(!is_v4("1..2.3", false));
    }

    #[test]
    fn test_v6_expansion() {
        let addr = parse_v6("2001:db8::1", None).unwrap();
        assert_eq!(addr.parts(), Some([0x2001, 0xdb8, 0, 0, 0, 0, 0, 1]));
        assert_eq!(addr.prefix_len(), 128);

        let full = parse_v6("1:2:3:4:5:6:7:8", None).unwrap();
        assert_eq!(full.parts(), Some([1, 2, 3, 4, 5, 6, 7, 8]));

        assert_eq!(parse_v6("::", None).unwrap().parts(), Some([0; 8]));
        assert_eq!(
            parse_v6("fe80::", None).unwrap().parts(),
            Some([0xfe80, 0, 0, 0, 0, 0, 0, 0])
        );
        assert_eq!(
            parse_v6("FFFF::AbCd", None).unwrap().parts(),
            Some([0xffff, 0, 0, 0, 0, 0, 0, 0xabcd])
        );
    }

    #[test]
    fn test_v6_compression_may_stand_for_no_groups() {
        let addr = parse_v6("1:2:3:4:5:6:7::8", None).unwrap();
        assert_eq!(addr.parts(), Some([1, 2, 3, 4, 5, 6, 7, 8]));
    }

    #[test]
    fn test_v6_embedded_ipv4() {
        let mapped = parse_v6("::ffff:192.168.1.1", None).unwrap();
        assert_eq!(
            mapped.parts(),
            Some([0, 0, 0, 0, 0, 0xffff, 0xc0a8, 0x0101])
        );
        let full = parse_v6("1:2:3:4:5:6:10.0.0.1", None).unwrap();
        assert_eq!(full.parts(), Some([1, 2, 3, 4, 5, 6, 0x0a00, 1]));
        assert!(matches!(
            parse_v6("::ffff:300.1.1.1", None),
            Err(AddrError::InvalidOctets(_))
        ));
    }

    #[test]
    fn test_v6_double_compression_rejected() {
        assert!(matches!(parse_v6("fe80::0::1", None), Err(AddrError::InvalidFormat(_))));
        assert!(!is_v6("fe80::0::1", false));
    }

    #[test]
    fn test_v6_group_count_and_width() {
        assert!(matches!(parse_v6("1:2:3", None), Err(AddrError::InvalidParts(_))));
        assert!(matches!(
            parse_v6("1:2:3:4:5:6:7:8:9", None),
            Err(AddrError::InvalidParts(_))
        ));
        assert!(matches!(parse_v6("1::2:3:4:5:6:7:8:9", None), Err(AddrError::InvalidParts(_))));
        assert!(matches!(parse_v6("12345::", None), Err(AddrError::InvalidParts(_))));
        assert!(is_v6("12345::", false));
        assert!(!is_v6("12345::", true));
    }

    #[test]
    fn test_v6_malformed() {
        for text in [":1", "1:", ":::", "1:::2", "g::1", "::1.2.3", "1.2.3.4", ""] {
            assert!(parse_v6(text, None).is_err(), "{text} should not parse");
        }
    }

    #[test]
    fn test_v6_prefix() {
        assert_eq!(parse_v6("fc00::/7", None).unwrap().prefix_len(), 7);
        assert_eq!(parse_v6("fc00::", Some(7)).unwrap().prefix_len(), 7);
        assert!(matches!(
            parse_v6("::1/129", None),
            Err(AddrError::InvalidPrefixLength { .. })
        ));
    }

    #[test]
    fn test_parse_dispatch() {
        assert_eq!(parse("::1").unwrap().kind(), Kind::V6);
        assert_eq!(parse("127.0.0.1").unwrap().kind(), Kind::V4);
        assert_eq!(
            parse("example.com"),
            Err(AddrError::NeitherV4NorV6("example.com".to_string()))
        );
        assert!(matches!(parse("fe80::0::1"), Err(AddrError::NeitherV4NorV6(_))));
        assert!(matches!(parse("256.0.0.1"), Err(AddrError::InvalidOctets(_))));
    }

    #[test]
    fn test_valid_never_fails() {
        assert!(valid("10.0.0.1"));
        assert!(valid("::ffff:10.0.0.1"));
        assert!(!valid("unknown"));
        assert!(!valid("999.1.1.1"));
        assert!(!valid(""));
    }

    #[test]
    fn test_from_str() {
        let addr: Address = "192.168.0.1".parse().unwrap();
        assert_eq!(addr.octets(), Some([192, 168, 0, 1]));
        assert!("not an ip".parse::<Address>().is_err());
    }

    #[test]
    fn test_v6_text_round_trip() {
        for text in ["::1", "2001:db8::", "fe80::1:2", "1:2:3:4:5:6:7:8", "::ffff:a00:1"] {
            assert_eq!(parse_v6(text, None).unwrap().to_string(), text);
        }
    }

    proptest! {
        #[test]
        fn prop_v4_display_round_trip(octets in any::<[u8; 4]>()) {
            let addr = Address::from(octets);
            prop_assert_eq!(parse_v4(&addr.to_string(), None).unwrap(), addr);
        }

        #[test]
        fn prop_v6_display_round_trip(parts in any::<[u16; 8]>()) {
            let addr = Address::from(parts);
            prop_assert_eq!(parse_v6(&addr.to_string(), None).unwrap(), addr);
        }
    }
}
