//! Trying resolvers one after another.

use crate::error::Error;
use crate::resolver::{LookupIp, Network, Resolver};
use std::net::IpAddr;
use tracing::trace;

//------------ Sequential ----------------------------------------------------

/// A resolver trying a list of resolvers in order.
///
/// The first successful answer is returned. If all resolvers fail, their
/// errors are joined.
#[derive(Default)]
pub struct Sequential {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl Sequential {
    /// Creates a resolver trying the given resolvers.
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Sequential { resolvers }
    }

    /// Adds a resolver to the end of the list.
    pub fn push(&mut self, resolver: impl Resolver + 'static) {
        self.resolvers.push(Box::new(resolver))
    }

    /// Returns the resolver with another one added to the end of the list.
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
}

impl FromIterator<Box<dyn Resolver>> for Sequential {
    fn from_iter<T: IntoIterator<Item = Box<dyn Resolver>>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Resolver for Sequential {
    fn lookup_ip<'a>(
        &'a self,
        network: Network,
        host: &'a str,
    ) -> LookupIp<'a> {
        Box::pin(lookup_in_order(
            &self.resolvers,
            0..self.resolvers.len(),
            network,
            host,
        ))
    }
}

/// Asks the resolvers in the order given by `order` until one succeeds.
pub(crate) async fn lookup_in_order(
    resolvers: &[Box<dyn Resolver>],
    order: impl IntoIterator<Item = usize>,
    network: Network,
    host: &str,
) -> Result<Vec<IpAddr>, Error> {
    let mut errors = Vec::new();
    for idx in order {
        match resolvers[idx].lookup_ip(network, host).await {
            Ok(addrs) => return Ok(addrs),
            Err(err) => {
                trace!(host, idx, "resolver failed: {err}");
                errors.push(err)
            }
        }
    }
    Err(Error::join(host, errors))
}
