//! Synthesizing IPv6 addresses for IPv4-only hosts.
//!
//! On an IPv6-only network, IPv4 hosts are reachable through a NAT64
//! gateway. [`Dns64`] provides the matching address synthesis as
//! described in [RFC 6147]: if a host has IPv4 addresses but no IPv6
//! addresses, IPv6 addresses are made up by embedding the IPv4 addresses
//! into the gateway’s prefix following [RFC 6052].
//!
//! [RFC 6052]: https://tools.ietf.org/html/rfc6052
//! [RFC 6147]: https://tools.ietf.org/html/rfc6147

use crate::addrselect::sort_by_rfc6724;
use crate::error::Error;
use crate::net::{Dialer, DirectDialer};
use crate::resolver::{unmap, LookupIp, Network, Resolver};
use core::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// The well-known prefix `64:ff9b::/96`.
pub const WELL_KNOWN_PREFIX: Ipv6Addr =
    Ipv6Addr::new(0x64, 0xff9b, 0, 0, 0, 0, 0, 0);

/// The prefix lengths allowed by RFC 6052.
const PREFIX_LENGTHS: [u8; 6] = [32, 40, 48, 56, 64, 96];

/// The index of the octet that is always zero in a synthesized address.
const U_OCTET: usize = 8;

//------------ Dns64 ---------------------------------------------------------

/// A resolver adding synthesized IPv6 addresses.
///
/// The inner resolver is always asked for addresses of both families. What
/// is returned depends on the network requested:
///
/// * [`Network::Ip4`]: the IPv4 addresses only,
/// * [`Network::Ip6`]: the IPv6 addresses if there are any, otherwise the
///   synthesized addresses,
/// * [`Network::Ip`]: the IPv4 addresses plus what `Ip6` would return.
///
/// Unless only IPv4 was requested, the result is ordered by preference.
pub struct Dns64<R> {
    inner: R,
    prefix: Ipv6Addr,
    prefix_len: u8,
    dialer: Arc<dyn Dialer>,
}

impl<R> Dns64<R> {
    /// Creates a resolver using the well-known prefix.
    pub fn new(inner: R) -> Self {
        Dns64 {
            inner,
            prefix: WELL_KNOWN_PREFIX,
            prefix_len: 96,
            dialer: Arc::new(DirectDialer),
        }
    }

    /// Creates a resolver using a network-specific prefix.
    ///
    /// The prefix length must be one of 32, 40, 48, 56, 64, or 96. Bits
    /// 64 to 71 of the prefix must be zero. Bits beyond the prefix length
    /// are ignored.
    pub fn with_prefix(
        inner: R,
        prefix: Ipv6Addr,
        prefix_len: u8,
    ) -> Result<Self, InvalidPrefix> {
        if !PREFIX_LENGTHS.contains(&prefix_len) {
            return Err(InvalidPrefix::Length(prefix_len));
        }
        if prefix_len > 64 && prefix.octets()[U_OCTET] != 0 {
            return Err(InvalidPrefix::ReservedBits);
        }
        let mut octets = [0; 16];
        let len = usize::from(prefix_len / 8);
        octets[..len].copy_from_slice(&prefix.octets()[..len]);
        Ok(Dns64 {
            prefix: octets.into(),
            prefix_len,
            ..Self::new(inner)
        })
    }

    /// Sets the dialer used to order addresses.
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = dialer;
        self
    }

    /// Returns the prefix and its length.
    pub fn prefix(&self) -> (Ipv6Addr, u8) {
        (self.prefix, self.prefix_len)
    }

    /// Embeds an IPv4 address into the prefix.
    pub fn synthesize(&self, addr: Ipv4Addr) -> Ipv6Addr {
        let mut octets = self.prefix.octets();
        let mut pos = usize::from(self.prefix_len / 8);
        for octet in addr.octets() {
            if pos == U_OCTET {
                pos += 1;
            }
            octets[pos] = octet;
            pos += 1;
        }
        octets.into()
    }
}

impl<R: Resolver> Dns64<R> {
    async fn lookup(
        &self,
        network: Network,
        host: &str,
    ) -> Result<Vec<IpAddr>, Error> {
        let addrs = self.inner.lookup_ip(Network::Ip, host).await?;
        let (mut v4, mut v6): (Vec<_>, Vec<_>) =
            addrs.into_iter().map(unmap).partition(IpAddr::is_ipv4);

        if network != Network::Ip4 && v6.is_empty() {
            v6 = v4
                .iter()
                .filter_map(|addr| match addr {
                    IpAddr::V4(addr) => Some(self.synthesize(*addr).into()),
                    IpAddr::V6(_) => None,
                })
                .collect();
        }

        let mut addrs = match network {
            Network::Ip4 => v4,
            Network::Ip6 => v6,
            Network::Ip => {
                v4.append(&mut v6);
                v4
            }
        };
        if addrs.is_empty() {
            return Err(Error::not_found(host));
        }
        if network != Network::Ip4 {
            sort_by_rfc6724(self.dialer.as_ref(), &mut addrs).await;
        }
        Ok(addrs)
    }
}

impl<R: Resolver> Resolver for Dns64<R> {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        Box::pin(self.lookup(network, host))
    }
}

//------------ InvalidPrefix -------------------------------------------------

/// A prefix unsuitable for address synthesis.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InvalidPrefix {
    /// The prefix length isn’t one of those defined by RFC 6052.
    Length(u8),

    /// Bits 64 to 71 of the prefix are not zero.
    ReservedBits,
}

impl fmt::Display for InvalidPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            InvalidPrefix::Length(len) => {
                write!(f, "invalid NAT64 prefix length {}", len)
            }
            InvalidPrefix::ReservedBits => {
                f.write_str("NAT64 prefix with non-zero reserved bits")
            }
        }
    }
}

impl std::error::Error for InvalidPrefix {}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::literal::Literal;
    use rstest::rstest;

    const ADDR: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 33);

    // The examples from section 2.4 of RFC 6052.
    #[rstest]
    #[case(32, "2001:db8::", "2001:db8:c000:221::")]
    #[case(40, "2001:db8:100::", "2001:db8:1c0:2:21::")]
    #[case(48, "2001:db8:122::", "2001:db8:122:c000:2:2100::")]
    #[case(56, "2001:db8:122:300::", "2001:db8:122:3c0:0:221::")]
    #[case(64, "2001:db8:122:344::", "2001:db8:122:344:c0:2:2100:0")]
    #[case(96, "2001:db8:122:344::", "2001:db8:122:344::192.0.2.33")]
    #[case(96, "64:ff9b::", "64:ff9b::192.0.2.33")]
    fn rfc6052_examples(
        #[case] len: u8,
        #[case] prefix: &str,
        #[case] expected: &str,
    ) {
        let dns64 = Dns64::with_prefix(Literal, prefix.parse().unwrap(), len)
            .unwrap();
        assert_eq!(
            dns64.synthesize(ADDR),
            expected.parse::<Ipv6Addr>().unwrap()
        );
    }

    #[test]
    fn invalid_prefixes() {
        assert_eq!(
            Dns64::with_prefix(Literal, WELL_KNOWN_PREFIX, 80).err(),
            Some(InvalidPrefix::Length(80))
        );
        let reserved = "2001:db8::ff00:0:0:0".parse().unwrap();
        assert_eq!(
            Dns64::with_prefix(Literal, reserved, 96).err(),
            Some(InvalidPrefix::ReservedBits)
        );
    }

    #[test]
    fn prefix_is_masked() {
        let dns64 =
            Dns64::with_prefix(Literal, "2001:db8::1".parse().unwrap(), 32)
                .unwrap();
        assert_eq!(dns64.prefix(), ("2001:db8::".parse().unwrap(), 32));
    }

    #[tokio::test]
    async fn synthesize_for_ip6() {
        let dns64 = Dns64::new(Literal);
        assert_eq!(
            dns64.lookup_ip(Network::Ip6, "10.0.0.1").await.unwrap(),
            vec!["64:ff9b::a00:1".parse::<IpAddr>().unwrap()]
        );
    }

    #[tokio::test]
    async fn native_addresses_are_kept() {
        let dns64 = Dns64::new(Literal);
        assert_eq!(
            dns64.lookup_ip(Network::Ip6, "2001:db8::1").await.unwrap(),
            vec!["2001:db8::1".parse::<IpAddr>().unwrap()]
        );
        assert_eq!(
            dns64.lookup_ip(Network::Ip4, "10.0.0.1").await.unwrap(),
            vec!["10.0.0.1".parse::<IpAddr>().unwrap()]
        );
    }

    #[tokio::test]
    async fn no_ipv4_is_not_found() {
        let dns64 = Dns64::new(Literal);
        let err = dns64
            .lookup_ip(Network::Ip4, "2001:db8::1")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
