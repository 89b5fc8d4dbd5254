/* src/range.rs */

use std::fmt;

use crate::address::Address;

/// Reserved-range label produced by [`Address::range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Range {
    Unspecified,
    Broadcast,
    Multicast,
    LinkLocal,
    Loopback,
    Private,
    Reserved,
    UniqueLocal,
    Ipv4Mapped,
    Rfc6145,
    Rfc6052,
    SixToFour,
    Teredo,
    Unicast,
}

impl Range {
    /// Label as it is reported, e.g. `uniqueLocal` or `6to4`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Range::Unspecified => "unspecified",
            Range::Broadcast => "broadcast",
            Range::Multicast => "multicast",
            Range::LinkLocal => "linkLocal",
            Range::Loopback => "loopback",
            Range::Private => "private",
            Range::Reserved => "reserved",
            Range::UniqueLocal => "uniqueLocal",
            Range::Ipv4Mapped => "ipv4Mapped",
            Range::Rfc6145 => "rfc6145",
            Range::Rfc6052 => "rfc6052",
            Range::SixToFour => "6to4",
            Range::Teredo => "teredo",
            Range::Unicast => "unicast",
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Checked in order, first match wins.
const V4_RANGES: &[(Range, &[([u8; 4], u8)])] = &[
    (Range::Unspecified, &[([0, 0, 0, 0], 8)]),
    (Range::Broadcast, &[([255, 255, 255, 255], 32)]),
    (Range::Multicast, &[([224, 0, 0, 0], 4)]),
    (Range::LinkLocal, &[([169, 254, 0, 0], 16)]),
    (Range::Loopback, &[([127, 0, 0, 0], 8)]),
    (
        Range::Private,
        &[([10, 0, 0, 0], 8), ([172, 16, 0, 0], 12), ([192, 168, 0, 0], 16)],
    ),
    (
        Range::Reserved,
        &[
            ([192, 0, 0, 0], 24),
            ([192, 0, 2, 0], 24),
            ([192, 88, 99, 0], 24),
            ([198, 51, 100, 0], 24),
            ([203, 0, 113, 0], 24),
            ([240, 0, 0, 0], 4),
        ],
    ),
];

const V6_RANGES: &[(Range, &[([u16; 8], u8)])] = &[
    (Range::Unspecified, &[([0, 0, 0, 0, 0, 0, 0, 0], 128)]),
    (Range::LinkLocal, &[([0xfe80, 0, 0, 0, 0, 0, 0, 0], 10)]),
    (Range::Multicast, &[([0xff00, 0, 0, 0, 0, 0, 0, 0], 8)]),
    (Range::Loopback, &[([0, 0, 0, 0, 0, 0, 0, 1], 128)]),
    (Range::UniqueLocal, &[([0xfc00, 0, 0, 0, 0, 0, 0, 0], 7)]),
    (Range::Ipv4Mapped, &[([0, 0, 0, 0, 0, 0xffff, 0, 0], 96)]),
    (Range::Rfc6145, &[([0, 0, 0, 0, 0xffff, 0, 0, 0], 96)]),
    (Range::Rfc6052, &[([0x64, 0xff9b, 0, 0, 0, 0, 0, 0], 96)]),
    (Range::SixToFour, &[([0x2002, 0, 0, 0, 0, 0, 0, 0], 16)]),
    (Range::Teredo, &[([0x2001, 0, 0, 0, 0, 0, 0, 0], 32)]),
    (Range::Reserved, &[([0x2001, 0xdb8, 0, 0, 0, 0, 0, 0], 32)]),
];

/// First table entry containing `addr`, or [`Range::Unicast`].
pub(crate) fn classify(addr: &Address) -> Range {
    let hit = if addr.octets().is_some() {
        first_match(addr, V4_RANGES)
    } else {
        first_match(addr, V6_RANGES)
    };
    hit.unwrap_or(Range::Unicast)
}

fn first_match<T>(addr: &Address, table: &[(Range, &[(T, u8)])]) -> Option<Range>
where
    T: Copy + Into<Address>,
{
    table
        .iter()
        .find(|(_, blocks)| {
            blocks
                .iter()
                .any(|&(network, prefix)| addr.match_bits(&network.into(), prefix))
        })
        .map(|&(range, _)| range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_v4, parse_v6};

    fn v4_range(text: &str) -> Range {
        parse_v4(text, None).unwrap().range()
    }

    fn v6_range(text: &str) -> Range {
        parse_v6(text, None).unwrap().range()
    }

    #[test]
    fn test_v4_ranges() {
        assert_eq!(v4_range("0.1.2.3"), Range::Unspecified);
        assert_eq!(v4_range("255.255.255.255"), Range::Broadcast);
        assert_eq!(v4_range("239.1.1.1"), Range::Multicast);
        assert_eq!(v4_range("169.254.10.1"), Range::LinkLocal);
        assert_eq!(v4_range("127.0.0.1"), Range::Loopback);
        assert_eq!(v4_range("10.1.2.3"), Range::Private);
        assert_eq!(v4_range("172.20.0.1"), Range::Private);
        assert_eq!(v4_range("192.168.0.1"), Range::Private);
        assert_eq!(v4_range("198.51.100.7"), Range::Reserved);
        assert_eq!(v4_range("240.1.2.3"), Range::Reserved);
        assert_eq!(v4_range("8.8.8.8"), Range::Unicast);
    }

    #[test]
    fn test_broadcast_wins_over_reserved() {
        // 255.255.255.255 also lies in 240.0.0.0/4
        assert_eq!(v4_range("255.255.255.255"), Range::Broadcast);
        assert_eq!(v4_range("255.255.255.254"), Range::Reserved);
    }

    #[test]
    fn test_v6_ranges() {
        assert_eq!(v6_range("::"), Range::Unspecified);
        assert_eq!(v6_range("fe80::1"), Range::LinkLocal);
        assert_eq!(v6_range("ff02::1"), Range::Multicast);
        assert_eq!(v6_range("::1"), Range::Loopback);
        assert_eq!(v6_range("fc00::"), Range::UniqueLocal);
        assert_eq!(v6_range("fd12:3456::1"), Range::UniqueLocal);
        assert_eq!(v6_range("::ffff:192.168.1.1"), Range::Ipv4Mapped);
        assert_eq!(v6_range("::ffff:0:10.0.0.1"), Range::Rfc6145);
        assert_eq!(v6_range("64:ff9b::1.2.3.4"), Range::Rfc6052);
        assert_eq!(v6_range("2002:c000:0204::1"), Range::SixToFour);
        assert_eq!(v6_range("2001::1"), Range::Teredo);
        assert_eq!(v6_range("2001:db8::1"), Range::Reserved);
        assert_eq!(v6_range("2606:4700::1"), Range::Unicast);
    }

    #[test]
    fn test_range_names() {
        assert_eq!(Range::UniqueLocal.to_string(), "uniqueLocal");
        assert_eq!(Range::SixToFour.to_string(), "6to4");
        assert_eq!(Range::Ipv4Mapped.as_str(), "ipv4Mapped");
    }
}
