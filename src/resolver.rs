//! The resolver abstraction.
//!
//! All resolvers of this crate, the leaf resolvers that actually produce
//! addresses as well as the combinators that compose other resolvers,
//! implement the [`Resolver`] trait. Its central operation is
//! [`lookup_ip`][Resolver::lookup_ip] which resolves a host name into a
//! list of addresses of the requested [`Network`].
//!
//! Lookups are futures. Dropping the future cancels the lookup including
//! all network exchanges it has started, so a deadline for a lookup is
//! simply a `tokio::time::timeout` around it.

use crate::error::Error;
use core::fmt;
use core::str::FromStr;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;

/// The future returned by [`Resolver::lookup_ip`].
pub type LookupIp<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<IpAddr>, Error>> + Send + 'a>>;

/// The future returned by [`Resolver::lookup_host`].
pub type LookupHost<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<String>, Error>> + Send + 'a>>;

//------------ Resolver ------------------------------------------------------

/// A type that can resolve host names into addresses.
pub trait Resolver: Send + Sync {
    /// Looks up the addresses of `host` for the given network.
    ///
    /// On success, the returned list is never empty. If there are no
    /// addresses of the requested family, the lookup fails with a
    /// “not found” error.
    fn lookup_ip<'a>(&'a self, network: Network, host: &'a str)
        -> LookupIp<'a>;

    /// Looks up the addresses of `host` in their string representation.
    ///
    /// This is the same as looking up addresses of both families.
    fn lookup_host<'a>(&'a self, host: &'a str) -> LookupHost<'a> {
        Box::pin(async move {
            let addrs = self.lookup_ip(Network::Ip, host).await?;
            Ok(addrs.iter().map(ToString::to_string).collect())
        })
    }

    /// Looks up addresses for a network given by its name.
    ///
    /// The network must be one of `"ip"`, `"ip4"`, or `"ip6"`. Any other
    /// value results in an “unsupported network” error.
    fn lookup_network<'a>(
        &'a self,
        network: &'a str,
        host: &'a str,
    ) -> LookupIp<'a> {
        match network.parse::<Network>() {
            Ok(network) => self.lookup_ip(network, host),
            Err(_) => {
                Box::pin(async move { Err(Error::unsupported_network(host)) })
            }
        }
    }
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        (**self).lookup_ip(network, host)
    }
}

impl<R: Resolver + ?Sized> Resolver for Box<R> {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        self.as_ref().lookup_ip(network, host)
    }
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        self.as_ref().lookup_ip(network, host)
    }
}

//------------ Network -------------------------------------------------------

/// The address family requested from a lookup.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Network {
    /// Addresses of both families.
    #[default]
    Ip,

    /// IPv4 addresses only.
    Ip4,

    /// IPv6 addresses only.
    Ip6,
}

impl Network {
    /// Returns whether an address belongs to the network.
    ///
    /// IPv4-mapped IPv6 addresses count as IPv4 addresses. They are also
    /// IPv6 addresses.
    pub fn contains(self, addr: IpAddr) -> bool {
        match self {
            Network::Ip => true,
            Network::Ip4 => unmap(addr).is_ipv4(),
            Network::Ip6 => addr.is_ipv6(),
        }
    }

    /// Keeps only the addresses that belong to the network.
    ///
    /// For [`Network::Ip4`], IPv4-mapped addresses are converted into
    /// plain IPv4 addresses.
    pub fn filter(
        self,
        addrs: impl IntoIterator<Item = IpAddr>,
    ) -> Vec<IpAddr> {
        addrs
            .into_iter()
            .filter(|addr| self.contains(*addr))
            .map(|addr| match self {
                Network::Ip4 => unmap(addr),
                _ => addr,
            })
            .collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Ip => "ip",
            Network::Ip4 => "ip4",
            Network::Ip6 => "ip6",
        }
    }
}

/// Converts an IPv4-mapped IPv6 address into an IPv4 address.
pub fn unmap(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => addr,
        },
        IpAddr::V4(_) => addr,
    }
}

impl FromStr for Network {
    type Err = UnsupportedNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ip" => Ok(Network::Ip),
            "ip4" => Ok(Network::Ip4),
            "ip6" => Ok(Network::Ip6),
            _ => Err(UnsupportedNetwork),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//------------ UnsupportedNetwork --------------------------------------------

/// A network name was not one of `ip`, `ip4`, or `ip6`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UnsupportedNetwork;

impl fmt::Display for UnsupportedNetwork {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("unsupported network")
    }
}

impl std::error::Error for UnsupportedNetwork {}

//============ Testing =======================================================
