//! Racing resolvers against each other.

use crate::error::Error;
use crate::resolver::{LookupIp, Network, Resolver};
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::net::IpAddr;
use tracing::trace;

//------------ Parallel ------------------------------------------------------

/// A resolver asking all its resolvers at the same time.
///
/// The first successful answer wins. The lookups still outstanding at that
/// time are dropped, which cancels them. If all resolvers fail, their
/// errors are joined in the order the failures arrived.
///
/// All lookups are driven by the future returned from
/// [`lookup_ip`][Resolver::lookup_ip] itself, no tasks are spawned.
/// Dropping that future thus cancels every lookup still in progress.
#[derive(Default)]
pub struct Parallel {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl Parallel {
    /// Creates a resolver racing the given resolvers.
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Parallel { resolvers }
    }

    /// Adds another resolver.
    pub fn push(&mut self, resolver: impl Resolver + 'static) {
        self.resolvers.push(Box::new(resolver))
    }

    /// Returns the resolver with another resolver added.
    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.push(resolver);
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    async fn lookup(
        &self,
        network: Network,
        host: &str,
    ) -> Result<Vec<IpAddr>, Error> {
        let mut pending: FuturesUnordered<_> = self
            .resolvers
            .iter()
            .map(|resolver| resolver.lookup_ip(network, host))
            .collect();
        let mut errors = Vec::new();
        while let Some(res) = pending.next().await {
            match res {
                Ok(addrs) => {
                    trace!(host, cancelled = pending.len(), "lookup won");
                    return Ok(addrs);
                }
                Err(err) => errors.push(err),
            }
        }
        Err(Error::join(host, errors))
    }
}

impl FromIterator<Box<dyn Resolver>> for Parallel {
    fn from_iter<T: IntoIterator<Item = Box<dyn Resolver>>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Resolver for Parallel {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        Box::pin(self.lookup(network, host))
    }
}
