//! IP address codec.
//!
//! Every address handled by the trie is normalized to a canonical 16-byte
//! form. IPv4 addresses are embedded as v4-mapped IPv6 (`::ffff:a.b.c.d`),
//! so IPv4 and IPv6 keys share one address space: bytes 10 and 11 are
//! `0xFF` and bytes 12-15 carry the four octets big-endian.

use std::net::IpAddr;

/// Number of bytes in a canonical address key.
pub const ADDR_LEN: usize = 16;

/// A canonical 16-byte address key.
pub type AddrBytes = [u8; ADDR_LEN];

/// Parses an IPv4 dotted-quad or IPv6 colon-hex string into the canonical
/// 16-byte form.
///
/// Returns `None` for malformed input; callers treat that as a miss or a
/// dropped insert rather than an error.
pub fn parse_addr(s: &str) -> Option<AddrBytes> {
    match s.parse::<IpAddr>().ok()? {
        IpAddr::V4(v4) => Some(v4.to_ipv6_mapped().octets()),
        IpAddr::V6(v6) => Some(v6.octets()),
    }
}

/// Embeds a `u32` IPv4 address into the canonical v4-mapped 16-byte form.
///
/// MaxMind distributes IPv4 ranges as decimal `u32` endpoints, so this is
/// the entry point for numeric block files.
pub fn u32_to_v4(n: u32) -> AddrBytes {
    let mut a = [0u8; ADDR_LEN];
    a[10] = 0xFF;
    a[11] = 0xFF;
    a[12..16].copy_from_slice(&n.to_be_bytes());
    a
}

/// Reads the IPv4 portion (bytes 12-15, big-endian) of a canonical key back
/// out as a `u32`.
pub fn v4_to_u32(addr: &AddrBytes) -> u32 {
    u32::from_be_bytes([addr[12], addr[13], addr[14], addr[15]])
}

/// Computes the first and last usable host address for a CIDR prefix.
///
/// The network and broadcast addresses are excluded: the start is the
/// network address with the low bit set and the end is one below the
/// broadcast address, so `192.168.1.0/24` yields
/// `(192.168.1.1, 192.168.1.254)`. The network address is derived from
/// `ip & mask`, so `192.168.1.77/24` produces the same range.
///
/// IPv4 prefixes longer than 30 and IPv6 prefixes longer than 126 are
/// declined (`None`) — past those lengths the usable-host window is empty
/// or degenerate. Malformed input is also `None`.
pub fn cidr_to_range(cidr: &str) -> Option<(AddrBytes, AddrBytes)> {
    let (addr, len) = cidr.split_once('/')?;
    let len: u32 = len.parse().ok()?;
    match addr.parse::<IpAddr>().ok()? {
        IpAddr::V4(v4) => {
            if len > 30 {
                return None;
            }
            let mask: u32 = if len == 0 { 0 } else { u32::MAX << (32 - len) };
            let network = u32::from(v4) & mask;
            let start = network | 0x01;
            let end = (network | !mask) - 1;
            Some((u32_to_v4(start), u32_to_v4(end)))
        }
        IpAddr::V6(v6) => {
            if len > 126 {
                return None;
            }
            let mask: u128 = if len == 0 { 0 } else { u128::MAX << (128 - len) };
            let network = u128::from_be_bytes(v6.octets()) & mask;
            let start = network | 0x01;
            let end = (network | !mask) - 1;
            Some((start.to_be_bytes(), end.to_be_bytes()))
        }
    }
}
