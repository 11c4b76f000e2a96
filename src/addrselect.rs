//! Destination address selection.
//!
//! This module orders a list of destination addresses by preference as
//! described in [RFC 6724]. Each destination is paired with the source
//! address the host would use to reach it. The pairs are then ordered by
//! the following rules, earlier rules taking precedence:
//!
//! 1. Avoid destinations without a usable source address.
//! 2. Prefer destinations whose scope matches that of their source.
//! 3. Prefer destinations whose policy label matches that of their source.
//! 4. Prefer destinations with a higher policy precedence.
//! 5. Prefer native transport over 6to4 and Teredo.
//! 6. Prefer destinations with a smaller scope.
//! 7. Among IPv6 destinations, prefer a longer common prefix with the
//!    source, looking at the first 64 bits only.
//!
//! Rules 3 (avoid deprecated addresses) and 4 (prefer home addresses) of
//! the RFC need information about the host’s interfaces that isn’t
//! available and are skipped.
//!
//! Destinations that compare equal keep their relative order.
//!
//! [RFC 6724]: https://tools.ietf.org/html/rfc6724

use crate::net::Dialer;
use futures_util::future::join_all;
use std::cmp::Reverse;
use std::net::{IpAddr, Ipv6Addr};

//------------ sort_by_rfc6724 -----------------------------------------------

/// Sorts `addrs` by preference.
///
/// The source address for each destination is determined through the
/// dialer’s [`probe_source`][Dialer::probe_source]. All probes run
/// concurrently. A destination for which probing fails is kept but sorted
/// towards the end.
pub async fn sort_by_rfc6724<D: Dialer + ?Sized>(
    dialer: &D,
    addrs: &mut [IpAddr],
) {
    if addrs.len() < 2 {
        return;
    }
    let sources =
        join_all(addrs.iter().map(|addr| dialer.probe_source(*addr))).await;
    sort_with_sources(addrs, &sources);
}

/// Sorts `addrs` by preference given the source address for each.
///
/// The source address for `addrs[i]` is `sources[i]` with `None` meaning
/// that there is no usable source address.
///
/// # Panics
///
/// The function panics if the two slices differ in length.
pub fn sort_with_sources(addrs: &mut [IpAddr], sources: &[Option<IpAddr>]) {
    assert_eq!(addrs.len(), sources.len());
    let mut keyed: Vec<_> = addrs
        .iter()
        .zip(sources)
        .map(|(dst, src)| (SortKey::new(*dst, *src), *dst))
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    for (target, (_, addr)) in addrs.iter_mut().zip(keyed) {
        *target = addr;
    }
}

//------------ SortKey -------------------------------------------------------

/// The sort key for a destination.
///
/// Each field stands for one of the rules, arranged so that a smaller value
/// is preferred. Because all rules only look at a destination and its own
/// source, the key fully determines the order and the order is total.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
struct SortKey {
    unusable: bool,
    scope_mismatch: bool,
    label_mismatch: bool,
    precedence: Reverse<u8>,
    not_native: bool,
    scope: u8,
    prefix_len: Reverse<u8>,
}

impl SortKey {
    fn new(dst: IpAddr, src: Option<IpAddr>) -> Self {
        let Some(src) = src else {
            return SortKey {
                unusable: true,
                scope_mismatch: false,
                label_mismatch: false,
                precedence: Reverse(0),
                not_native: false,
                scope: 0,
                prefix_len: Reverse(0),
            };
        };
        let dst_attr = Attr::new(dst);
        let src_attr = Attr::new(src);
        SortKey {
            unusable: false,
            scope_mismatch: dst_attr.scope != src_attr.scope,
            label_mismatch: dst_attr.label != src_attr.label,
            precedence: Reverse(dst_attr.precedence),
            not_native: matches!(dst_attr.label, LABEL_6TO4 | LABEL_TEREDO),
            scope: dst_attr.scope,
            prefix_len: Reverse(common_prefix_len(dst, src)),
        }
    }
}

//------------ Attr ----------------------------------------------------------

/// The attributes of an address relevant for ordering.
#[derive(Clone, Copy, Debug)]
struct Attr {
    scope: u8,
    precedence: u8,
    label: u8,
}

impl Attr {
    fn new(addr: IpAddr) -> Self {
        let policy = classify(&as_ipv6(addr));
        Attr {
            scope: scope(addr),
            precedence: policy.precedence,
            label: policy.label,
        }
    }
}

//------------ Policy Table --------------------------------------------------

const LABEL_6TO4: u8 = 2;
const LABEL_TEREDO: u8 = 5;

/// An entry of the policy table.
struct Policy {
    prefix: [u8; 16],
    len: u8,
    precedence: u8,
    label: u8,
}

/// The default policy table of RFC 6724, section 2.1.
///
/// The entries are ordered by decreasing prefix length so that the first
/// match is the longest match.
const POLICY_TABLE: &[Policy] = &[
    // ::1/128
    Policy {
        prefix: [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
        len: 128,
        precedence: 50,
        label: 0,
    },
    // ::ffff:0:0/96
    Policy {
        prefix: [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0, 0, 0, 0],
        len: 96,
        precedence: 35,
        label: 4,
    },
    // ::/96
    Policy {
        prefix: [0; 16],
        len: 96,
        precedence: 1,
        label: 3,
    },
    // 2001::/32
    Policy {
        prefix: [0x20, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        len: 32,
        precedence: 5,
        label: LABEL_TEREDO,
    },
    // 2002::/16
    Policy {
        prefix: [0x20, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        len: 16,
        precedence: 30,
        label: LABEL_6TO4,
    },
    // 3ffe::/16
    Policy {
        prefix: [0x3f, 0xfe, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        len: 16,
        precedence: 1,
        label: 12,
    },
    // fec0::/10
    Policy {
        prefix: [0xfe, 0xc0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        len: 10,
        precedence: 1,
        label: 11,
    },
    // fc00::/7
    Policy {
        prefix: [0xfc, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        len: 7,
        precedence: 3,
        label: 13,
    },
    // ::/0
    Policy {
        prefix: [0; 16],
        len: 0,
        precedence: 40,
        label: 1,
    },
];

/// Returns the policy table entry for an address.
fn classify(addr: &Ipv6Addr) -> &'static Policy {
    let octets = addr.octets();
    POLICY_TABLE
        .iter()
        .find(|policy| prefix_matches(&octets, &policy.prefix, policy.len))
        .unwrap_or(&POLICY_TABLE[POLICY_TABLE.len() - 1])
}

fn prefix_matches(addr: &[u8; 16], prefix: &[u8; 16], len: u8) -> bool {
    let full = usize::from(len / 8);
    if addr[..full] != prefix[..full] {
        return false;
    }
    let rest = len % 8;
    if rest == 0 {
        return true;
    }
    let mask = 0xffu8 << (8 - rest);
    addr[full] & mask == prefix[full] & mask
}

//------------ Helpers -------------------------------------------------------

const SCOPE_LINK_LOCAL: u8 = 0x2;
const SCOPE_SITE_LOCAL: u8 = 0x5;
const SCOPE_GLOBAL: u8 = 0xe;

/// Returns an address as IPv6, mapping IPv4 addresses.
fn as_ipv6(addr: IpAddr) -> Ipv6Addr {
    match addr {
        IpAddr::V4(v4) => v4.to_ipv6_mapped(),
        IpAddr::V6(v6) => v6,
    }
}

/// Returns the scope of an address.
fn scope(addr: IpAddr) -> u8 {
    match crate::resolver::unmap(addr) {
        IpAddr::V4(v4) => {
            if v4.is_loopback() || v4.is_link_local() {
                SCOPE_LINK_LOCAL
            } else {
                SCOPE_GLOBAL
            }
        }
        IpAddr::V6(v6) => {
            let octets = v6.octets();
            let link_local = octets[0] == 0xfe && octets[1] & 0xc0 == 0x80;
            if v6.is_loopback() || link_local {
                SCOPE_LINK_LOCAL
            } else if v6.is_multicast() {
                octets[1] & 0x0f
            } else if octets[0] == 0xfe && octets[1] & 0xc0 == 0xc0 {
                SCOPE_SITE_LOCAL
            } else {
                SCOPE_GLOBAL
            }
        }
    }
}

/// Returns the length of the common prefix of two IPv6 addresses.
///
/// Only the first 64 bits are considered. IPv4 and IPv4-mapped addresses
/// have no common prefix with anything.
fn common_prefix_len(dst: IpAddr, src: IpAddr) -> u8 {
    let (IpAddr::V6(dst), IpAddr::V6(src)) = (dst, src) else {
        return 0;
    };
    if dst.to_ipv4_mapped().is_some() || src.to_ipv4_mapped().is_some() {
        return 0;
    }
    let (dst, src) = (dst.octets(), src.octets());
    let mut len = 0;
    for (a, b) in dst[..8].iter().zip(&src[..8]) {
        let diff = a ^ b;
        if diff != 0 {
            // At most seven, so this doesn't overflow.
            return len + diff.leading_zeros() as u8;
        }
        len += 8;
    }
    len
}

//============ Testing =======================================================
