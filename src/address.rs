/* src/address.rs */

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{AddrError, Result};
use crate::range::{self, Range};

/// Address family of an [`Address`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    V4,
    V6,
}

impl Kind {
    /// Longest prefix length the family allows.
    pub const fn max_prefix_len(self) -> u8 {
        match self {
            Kind::V4 => 32,
            Kind::V6 => 128,
        }
    }

    /// Width in bits of one comparison limb.
    pub const fn limb_width(self) -> u32 {
        match self {
            Kind::V4 => 8,
            Kind::V6 => 16,
        }
    }

    /// Lowercase family name, `ipv4` or `ipv6`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Kind::V4 => "ipv4",
            Kind::V6 => "ipv6",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Repr {
    V4([u8; 4]),
    V6([u16; 8]),
}

/// An immutable IPv4 or IPv6 address with an attached prefix length.
///
/// `PartialEq` compares octets/groups and prefix length structurally. Block
/// membership is asked through [`Address::equals`] and [`Address::matches`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    repr: Repr,
    prefix_len: u8,
}

impl Address {
    /// Build an IPv4 address. `cidr` defaults to 32.
    pub fn v4(octets: [u8; 4], cidr: Option<u8>) -> Result<Self> {
        Self::with_repr(Repr::V4(octets), cidr)
    }

    /// Build an IPv6 address from its eight groups. `cidr` defaults to 128.
    pub fn v6(parts: [u16; 8], cidr: Option<u8>) -> Result<Self> {
        Self::with_repr(Repr::V6(parts), cidr)
    }

    /// Build an IPv6 address whose last two groups come from an embedded IPv4 address.
    pub fn v6_with_ipv4(parts: [u16; 6], embedded: [u8; 4], cidr: Option<u8>) -> Result<Self> {
        let mut groups = [0u16; 8];
        groups[..6].copy_from_slice(&parts);
        groups[6] = u16::from_be_bytes([embedded[0], embedded[1]]);
        groups[7] = u16::from_be_bytes([embedded[2], embedded[3]]);
        Self::v6(groups, cidr)
    }

    fn with_repr(repr: Repr, cidr: Option<u8>) -> Result<Self> {
        let mut addr = Self {
            repr,
            prefix_len: 0,
        };
        addr.prefix_len = check_prefix(addr.kind(), cidr)?;
        Ok(addr)
    }

    /// Address family.
    pub fn kind(&self) -> Kind {
        match self.repr {
            Repr::V4(_) => Kind::V4,
            Repr::V6(_) => Kind::V6,
        }
    }

    /// Prefix length bound to this address.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The four octets, if this is an IPv4 address.
    pub fn octets(&self) -> Option<[u8; 4]> {
        match self.repr {
            Repr::V4(octets) => Some(octets),
            Repr::V6(_) => None,
        }
    }

    /// The eight groups, if this is an IPv6 address.
    pub fn parts(&self) -> Option<[u16; 8]> {
        match self.repr {
            Repr::V4(_) => None,
            Repr::V6(parts) => Some(parts),
        }
    }

    /// Return a copy bound to a different prefix length.
    pub fn with_cidr(&self, cidr: u8) -> Result<Self> {
        Ok(Self {
            repr: self.repr,
            prefix_len: check_prefix(self.kind(), Some(cidr))?,
        })
    }

    /// Named reserved range this address falls in.
    pub fn range(&self) -> Range {
        range::classify(self)
    }

    /// Whether the leading `cidr` bits of `self` and `other` agree.
    ///
    /// `cidr` defaults to `other`'s prefix length. Comparing addresses of
    /// different families fails with [`AddrError::KindMismatch`]; bridge them
    /// first with [`Address::to_ipv4`] or [`Address::to_ipv4_mapped`].
    pub fn matches(&self, other: &Address, cidr: Option<u8>) -> Result<bool> {
        if self.kind() != other.kind() {
            return Err(AddrError::KindMismatch {
                left: self.kind(),
                right: other.kind(),
            });
        }
        let cidr = match cidr {
            Some(cidr) => check_prefix(self.kind(), Some(cidr))?,
            None => other.prefix_len,
        };
        Ok(self.match_bits(other, cidr))
    }

    /// True when `self` lies inside the block `(other, other.prefix_len())`.
    ///
    /// This is not symmetric: `a.equals(&b)` uses `b`'s prefix length only.
    pub fn equals(&self, other: &Address) -> Result<bool> {
        self.matches(other, None)
    }

    /// Limb-wise prefix comparison. Different families never match.
    pub(crate) fn match_bits(&self, other: &Address, cidr: u8) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        let width = self.kind().limb_width();
        let (left, len) = self.limbs();
        let (right, _) = other.limbs();

        let mut remaining = u32::from(cidr);
        for (a, b) in left[..len].iter().zip(&right[..len]) {
            if remaining == 0 {
                break;
            }
            let shift = width.saturating_sub(remaining);
            if (a >> shift) != (b >> shift) {
                return false;
            }
            remaining = remaining.saturating_sub(width);
        }
        true
    }

    /// Octets or groups widened to `u16`, with the number of limbs in use.
    fn limbs(&self) -> ([u16; 8], usize) {
        let mut limbs = [0u16; 8];
        match self.repr {
            Repr::V4(octets) => {
                for (limb, octet) in limbs.iter_mut().zip(octets) {
                    *limb = u16::from(octet);
                }
                (limbs, 4)
            }
            Repr::V6(parts) => (parts, 8),
        }
    }

    /// Prefix length read from this address used as a netmask.
    ///
    /// Fully set limbs count their whole width. The first limb that is not
    /// fully set contributes its leading one bits and ends the scan, so set
    /// bits after the first zero are ignored rather than rejected.
    pub fn netmask_prefix_len(&self) -> u8 {
        let width = self.kind().limb_width();
        let full = (1u32 << width) - 1;
        let top = 1u32 << (width - 1);
        let (limbs, len) = self.limbs();

        let mut prefix = 0u32;
        for &limb in &limbs[..len] {
            let mut bits = u32::from(limb);
            if bits == full {
                prefix += width;
                continue;
            }
            while bits & top != 0 {
                prefix += 1;
                bits = (bits << 1) & full;
            }
            break;
        }
        prefix as u8
    }

    /// Whether this is an IPv6 address inside `::ffff:0:0/96`.
    pub fn is_ipv4_mapped(&self) -> bool {
        self.range() == Range::Ipv4Mapped
    }

    /// Embed an IPv4 address as `::ffff:a.b.c.d`. The prefix grows by 96.
    pub fn to_ipv4_mapped(&self) -> Result<Self> {
        match self.repr {
            Repr::V4(octets) => Self::v6_with_ipv4(
                [0, 0, 0, 0, 0, 0xffff],
                octets,
                Some(self.prefix_len + 96),
            ),
            Repr::V6(_) => Err(AddrError::KindMismatch {
                left: Kind::V6,
                right: Kind::V4,
            }),
        }
    }

    /// Extract the IPv4 address from an IPv4-mapped IPv6 address.
    pub fn to_ipv4(&self) -> Result<Self> {
        match self.repr {
            Repr::V6(parts) if self.is_ipv4_mapped() => {
                let [a, b] = parts[6].to_be_bytes();
                let [c, d] = parts[7].to_be_bytes();
                Self::v4([a, b, c, d], Some(self.prefix_len.saturating_sub(96)))
            }
            _ => Err(AddrError::NotIpv4Mapped(self.to_string())),
        }
    }

    /// Convert to the standard library representation, dropping the prefix.
    pub fn to_ip_addr(&self) -> IpAddr {
        match self.repr {
            Repr::V4(octets) => IpAddr::V4(Ipv4Addr::from(octets)),
            Repr::V6(parts) => IpAddr::V6(Ipv6Addr::from(parts)),
        }
    }
}

/// Validate an explicit prefix length, or fall back to the family maximum.
fn check_prefix(kind: Kind, cidr: Option<u8>) -> Result<u8> {
    let max = kind.max_prefix_len();
    match cidr {
        None => Ok(max),
        Some(prefix) if prefix <= max => Ok(prefix),
        Some(prefix) => Err(AddrError::InvalidPrefixLength {
            prefix: u32::from(prefix),
            max,
        }),
    }
}

impl From<[u8; 4]> for Address {
    fn from(octets: [u8; 4]) -> Self {
        Self {
            repr: Repr::V4(octets),
            prefix_len: 32,
        }
    }
}

impl From<[u16; 8]> for Address {
    fn from(parts: [u16; 8]) -> Self {
        Self {
            repr: Repr::V6(parts),
            prefix_len: 128,
        }
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => v4.octets().into(),
            IpAddr::V6(v6) => v6.segments().into(),
        }
    }
}

impl From<Address> for IpAddr {
    fn from(addr: Address) -> Self {
        addr.to_ip_addr()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            Repr::V4([a, b, c, d]) => write!(f, "{a}.{b}.{c}.{d}"),
            Repr::V6(parts) => {
                let Some((start, len)) = longest_zero_run(&parts) else {
                    return write_groups(f, &parts);
                };
                write_groups(f, &parts[..start])?;
                f.write_str("::")?;
                write_groups(f, &parts[start + len..])
            }
        }
    }
}

/// First longest run of at least two zero groups.
fn longest_zero_run(parts: &[u16; 8]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut i = 0;
    while i < parts.len() {
        if parts[i] != 0 {
            i += 1;
            continue;
        }
        let start = i;
        while i < parts.len() && parts[i] == 0 {
            i += 1;
        }
        let len = i - start;
        if len >= 2 && best.is_none_or(|(_, best_len)| len > best_len) {
            best = Some((start, len));
        }
    }
    best
}

fn write_groups(f: &mut fmt::Formatter<'_>, groups: &[u16]) -> fmt::Result {
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            f.write_str(":")?;
        }
        write!(f, "{group:x}")?;
    }
    Ok(())
}
