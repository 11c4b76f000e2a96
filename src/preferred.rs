//! Ordering addresses by preference.

use crate::addrselect::sort_by_rfc6724;
use crate::error::Error;
use crate::net::{Dialer, DirectDialer};
use crate::resolver::{LookupIp, Network, Resolver};
use std::net::IpAddr;
use std::sync::Arc;

//------------ PreferredAddress ----------------------------------------------

/// A resolver ordering the addresses of its inner resolver.
///
/// The addresses are sorted following the destination address selection
/// rules of RFC 6724, see the [`addrselect`][crate::addrselect] module.
/// Lookups for IPv4 addresses only are passed through unchanged.
pub struct PreferredAddress<R> {
    inner: R,
    dialer: Arc<dyn Dialer>,
}

impl<R> PreferredAddress<R> {
    pub fn new(inner: R) -> Self {
        PreferredAddress {
            inner,
            dialer: Arc::new(DirectDialer),
        }
    }

    /// Sets the dialer used to find the source address for a destination.
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = dialer;
        self
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: Resolver> PreferredAddress<R> {
    async fn lookup(
        &self,
        network: Network,
        host: &str,
    ) -> Result<Vec<IpAddr>, Error> {
        let mut addrs = self.inner.lookup_ip(network, host).await?;
        if network != Network::Ip4 {
            sort_by_rfc6724(self.dialer.as_ref(), &mut addrs).await;
        }
        Ok(addrs)
    }
}

impl<R: Resolver> Resolver for PreferredAddress<R> {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        Box::pin(self.lookup(network, host))
    }
}
