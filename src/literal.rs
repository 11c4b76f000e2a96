//! Resolvers for address literals.
//!
//! These resolvers never touch the network. [`Ip`] only understands host
//! strings that are addresses already. [`Literal`] additionally knows that
//! `localhost` is the loopback address, no matter what any other source
//! says about it.

use crate::base::name;
use crate::error::Error;
use crate::resolver::{LookupIp, Network, Resolver};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

//------------ Literal -------------------------------------------------------

/// A resolver for address literals and `localhost`.
///
/// The name `localhost` resolves to both `::1` and `127.0.0.1`, in this
/// order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Literal;

impl Literal {
    pub fn new() -> Self {
        Literal
    }

    fn lookup(network: Network, host: &str) -> Result<Vec<IpAddr>, Error> {
        let addrs = match host.parse::<IpAddr>() {
            Ok(addr) => vec![addr],
            Err(_) if name::canonical(host) == "localhost." => vec![
                Ipv6Addr::LOCALHOST.into(),
                Ipv4Addr::LOCALHOST.into(),
            ],
            Err(_) => Vec::new(),
        };
        let addrs = network.filter(addrs);
        if addrs.is_empty() {
            return Err(Error::not_found(host));
        }
        Ok(addrs)
    }
}

impl Resolver for Literal {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        Box::pin(async move { Self::lookup(network, host) })
    }
}

//------------ Ip ------------------------------------------------------------

/// A resolver for address literals only.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ip;

impl Ip {
    pub fn new() -> Self {
        Ip
    }

    fn lookup(network: Network, host: &str) -> Result<Vec<IpAddr>, Error> {
        match host.parse::<IpAddr>() {
            Ok(addr) if network.contains(addr) => Ok(vec![addr]),
            _ => Err(Error::not_found(host)),
        }
    }
}

impl Resolver for Ip {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        Box::pin(async move { Self::lookup(network, host) })
    }
}

//============ Testing =======================================================
